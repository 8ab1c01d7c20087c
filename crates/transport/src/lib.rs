//! Telephony provider transport
//!
//! The provider reaches us through stateless form-encoded webhooks and is
//! answered with TwiML documents; outbound calls are placed through its REST
//! API.
//!
//! - [`webhook`]: inbound payload shapes
//! - [`twiml`]: response markup builder and renderer
//! - [`client`]: call placement

pub mod client;
pub mod twiml;
pub mod webhook;

pub use client::{OutboundCall, PlacedCall, TelephonyProvider, TwilioClient, TwilioSettings};
pub use twiml::{Dial, Gather, Say, TwimlResponse, Verb, FALLBACK_TWIML};
pub use webhook::{ConnectWebhook, FallbackQuery, StatusWebhook, TurnWebhook};

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Markup rendering failed: {0}")]
    Markup(String),

    #[error("Provider rejected request ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout")]
    Timeout,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<TransportError> for voice_call_core::Error {
    fn from(err: TransportError) -> Self {
        voice_call_core::Error::Telephony(err.to_string())
    }
}
