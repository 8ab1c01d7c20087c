//! Agent errors

use thiserror::Error;
use voice_call_transport::TransportError;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Caller-supplied call parameters are unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider did not place the call
    #[error("Failed to initiate call: {0}")]
    Placement(#[from] TransportError),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Invalid session payload: {0}")]
    Payload(String),
}

impl From<voice_call_core::Error> for AgentError {
    fn from(err: voice_call_core::Error) -> Self {
        match err {
            voice_call_core::Error::Payload(m) => AgentError::Payload(m),
            voice_call_core::Error::PhoneNumber(m) => AgentError::InvalidRequest(m),
            other => AgentError::Store(other.to_string()),
        }
    }
}
