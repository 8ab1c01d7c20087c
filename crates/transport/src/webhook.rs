//! Inbound webhook payloads
//!
//! Every field defaults to empty so a malformed delivery still deserializes
//! and is routed to the graceful-degradation paths.

use serde::{Deserialize, Serialize};
use voice_call_core::CallStatus;

/// Fired once when the callee answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConnectWebhook {
    pub call_sid: String,
    pub from: String,
    pub to: String,
}

/// Fired after each listen step with the speech-to-text transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TurnWebhook {
    pub call_sid: String,
    pub speech_result: String,
}

impl TurnWebhook {
    pub fn utterance(&self) -> &str {
        self.speech_result.trim()
    }
}

/// Call status callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StatusWebhook {
    pub call_sid: String,
    pub call_status: String,
    /// Seconds, sent as text; absent or blank for unanswered calls
    pub call_duration: Option<String>,
}

impl StatusWebhook {
    pub fn status(&self) -> CallStatus {
        CallStatus::parse(&self.call_status)
    }

    pub fn duration_secs(&self) -> Option<u32> {
        self.call_duration
            .as_deref()
            .and_then(|d| d.trim().parse().ok())
    }
}

/// Query string of the connect webhook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackQuery {
    /// Base64 session payload
    #[serde(default)]
    pub data: Option<String>,
}
