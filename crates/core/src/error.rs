//! Error types shared across the voice call crates

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session store error: {0}")]
    Store(String),

    #[error("Invalid session payload: {0}")]
    Payload(String),

    #[error("Invalid phone number: {0}")]
    PhoneNumber(String),

    #[error("AI backend error: {0}")]
    Llm(String),

    #[error("Telephony error: {0}")]
    Telephony(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Payload(err.to_string())
    }
}
