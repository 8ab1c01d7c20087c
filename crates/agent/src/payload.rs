//! Fallback session payload
//!
//! The session seed travels inside the connect webhook URL so a call can be
//! re-seeded when the store has lost it (restart, another instance). The
//! payload is base64 over JSON; knowledge chunks are dropped when the encoded
//! form would exceed the URL budget.

use base64::{engine::general_purpose, Engine as _};
use voice_call_core::{Error, Result, SessionSeed};

/// Encode a seed for embedding in a URL query parameter
pub fn encode_seed(seed: &SessionSeed) -> Result<String> {
    let json = serde_json::to_vec(seed)?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(json))
}

/// Encode a seed within `max_bytes`.
///
/// Returns the encoded payload and whether knowledge chunks had to be dropped.
pub fn encode_for_url(seed: &SessionSeed, max_bytes: usize) -> Result<(String, bool)> {
    let encoded = encode_seed(seed)?;
    if encoded.len() <= max_bytes || seed.knowledge_chunks.is_empty() {
        return Ok((encoded, false));
    }

    let slim = SessionSeed {
        knowledge_chunks: Vec::new(),
        ..seed.clone()
    };
    let encoded_slim = encode_seed(&slim)?;
    tracing::warn!(
        full_bytes = encoded.len(),
        slim_bytes = encoded_slim.len(),
        max_bytes,
        chunks = seed.knowledge_chunks.len(),
        "Fallback payload too large, dropped knowledge chunks"
    );
    Ok((encoded_slim, true))
}

/// Decode a fallback payload.
///
/// Accepts URL-safe and standard alphabets, padded or not. A standard payload
/// whose `+` was turned into a space by form decoding is repaired first.
pub fn decode_seed(payload: &str) -> Result<SessionSeed> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(Error::Payload("empty payload".to_string()));
    }

    let unpadded = trimmed.trim_end_matches('=');
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(unpadded)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(unpadded.replace(' ', "+")))
        .map_err(|e| Error::Payload(format!("not base64: {}", e)))?;

    Ok(serde_json::from_slice(&bytes)?)
}
