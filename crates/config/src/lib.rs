//! Configuration management for the voice call orchestrator
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default.*`, `config/{env}.*`)
//! - Environment variables (`VOICE_CALL__` prefix, `__` between sections)
//! - Conventional provider variables (`TWILIO_*`, `AI_BACKEND_URL`, `PUBLIC_BASE_URL`)
//!   used as field defaults

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AiBackendConfig, ConversationConfig, GatherTiming,
    KnowledgeConfig, ObservabilityConfig, PersistenceConfig, RuntimeEnvironment, ServerConfig,
    SessionConfig, Settings, TelephonyConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
