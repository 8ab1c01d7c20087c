//! External AI backend integration
//!
//! Features:
//! - `AiBackend` trait consumed by the conversation engine
//! - HTTP implementation speaking the backend's voice-response contract
//! - Deadline helper so no turn awaits the backend past its budget

pub mod backend;
pub mod deadline;
pub mod types;

pub use backend::{AiBackend, AiBackendSettings, HttpAiBackend};
pub use deadline::with_deadline;
pub use types::{AiReply, AiTurnRequest, CallContext};

use thiserror::Error;

/// AI backend errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Short label used as a metrics tag
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Api { .. } => "api",
            LlmError::Network(_) => "network",
            LlmError::InvalidResponse(_) => "invalid_response",
            LlmError::Timeout => "timeout",
            LlmError::Configuration(_) => "configuration",
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for voice_call_core::Error {
    fn from(err: LlmError) -> Self {
        voice_call_core::Error::Llm(err.to_string())
    }
}
