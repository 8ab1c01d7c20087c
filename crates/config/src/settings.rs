//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{conversation, endpoints, knowledge, session, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation
    #[default]
    Development,
    Staging,
    /// Telephony credentials and public URL must be configured
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Telephony provider account and call parameters
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// External AI backend
    #[serde(default)]
    pub ai_backend: AiBackendConfig,

    /// Session store sizing and sweep
    #[serde(default)]
    pub session: SessionConfig,

    /// Conversation policy knobs
    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Call log persistence (ScyllaDB)
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL the provider calls back on
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins; empty means any origin in development only
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_public_base_url() -> String {
    std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Telephony provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    #[serde(default = "default_account_sid")]
    pub account_sid: String,

    #[serde(default = "default_auth_token", skip_serializing)]
    pub auth_token: String,

    /// Origination number for outbound calls and caller id on transfers
    #[serde(default = "default_from_number")]
    pub from_number: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Call placement request timeout (ms)
    #[serde(default = "default_placement_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Country code (without `+`) assumed for local numbers
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    /// Connect timeout when bridging to a human (seconds)
    #[serde(default = "default_bridge_timeout_secs")]
    pub bridge_timeout_secs: u32,
}

fn default_account_sid() -> String {
    std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default()
}
fn default_auth_token() -> String {
    std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default()
}
fn default_from_number() -> String {
    std::env::var("TWILIO_PHONE_NUMBER").unwrap_or_default()
}
fn default_api_base_url() -> String {
    endpoints::TWILIO_API_BASE.to_string()
}
fn default_placement_timeout_ms() -> u64 {
    timeouts::CALL_PLACEMENT_MS
}
fn default_country_code() -> String {
    conversation::DEFAULT_COUNTRY_CODE.to_string()
}
fn default_bridge_timeout_secs() -> u32 {
    timeouts::BRIDGE_SECS
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: default_account_sid(),
            auth_token: default_auth_token(),
            from_number: default_from_number(),
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_placement_timeout_ms(),
            default_country_code: default_country_code(),
            bridge_timeout_secs: default_bridge_timeout_secs(),
        }
    }
}

impl TelephonyConfig {
    pub fn has_credentials(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// External AI backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiBackendConfig {
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,

    /// Per-turn budget (ms)
    #[serde(default = "default_ai_timeout_ms")]
    pub timeout_ms: u64,

    /// Readiness probe budget (ms)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_ai_endpoint() -> String {
    std::env::var("AI_BACKEND_URL").unwrap_or_else(|_| endpoints::AI_BACKEND_DEFAULT.to_string())
}
fn default_ai_timeout_ms() -> u64 {
    timeouts::AI_BACKEND_MS
}
fn default_probe_timeout_ms() -> u64 {
    timeouts::READINESS_PROBE_MS
}

impl Default for AiBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            timeout_ms: default_ai_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl AiBackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Soft bound; exceeding it is logged, sessions are never evicted for it
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_max_fallback_payload_bytes")]
    pub max_fallback_payload_bytes: usize,
}

fn default_max_age_secs() -> u64 {
    session::MAX_AGE_SECS
}
fn default_sweep_interval_secs() -> u64 {
    session::SWEEP_INTERVAL_SECS
}
fn default_history_limit() -> usize {
    session::HISTORY_LIMIT
}
fn default_max_sessions() -> usize {
    session::MAX_SESSIONS
}
fn default_max_fallback_payload_bytes() -> usize {
    session::MAX_FALLBACK_PAYLOAD_BYTES
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            history_limit: default_history_limit(),
            max_sessions: default_max_sessions(),
            max_fallback_payload_bytes: default_max_fallback_payload_bytes(),
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Listen-step timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherTiming {
    /// Seconds to wait for speech to start
    pub timeout_secs: u32,
    /// Seconds of silence that end an utterance
    #[serde(default)]
    pub speech_timeout_secs: Option<u32>,
}

/// Conversation policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_escalation_keywords")]
    pub escalation_keywords: Vec<String>,

    #[serde(default = "default_offer_threshold")]
    pub escalation_offer_threshold: u32,

    #[serde(default = "default_greeting_gather")]
    pub greeting_gather: GatherTiming,

    #[serde(default = "default_followup_gather")]
    pub followup_gather: GatherTiming,

    #[serde(default = "default_callback_gather")]
    pub callback_gather: GatherTiming,
}

fn default_escalation_keywords() -> Vec<String> {
    conversation::ESCALATION_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}
fn default_offer_threshold() -> u32 {
    conversation::ESCALATION_OFFER_THRESHOLD
}
fn default_greeting_gather() -> GatherTiming {
    GatherTiming {
        timeout_secs: conversation::GREETING_GATHER_TIMEOUT_SECS,
        speech_timeout_secs: Some(conversation::GREETING_SPEECH_TIMEOUT_SECS),
    }
}
fn default_followup_gather() -> GatherTiming {
    GatherTiming {
        timeout_secs: conversation::FOLLOWUP_GATHER_TIMEOUT_SECS,
        speech_timeout_secs: Some(conversation::FOLLOWUP_SPEECH_TIMEOUT_SECS),
    }
}
fn default_callback_gather() -> GatherTiming {
    GatherTiming {
        timeout_secs: conversation::CALLBACK_GATHER_TIMEOUT_SECS,
        speech_timeout_secs: None,
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            escalation_keywords: default_escalation_keywords(),
            escalation_offer_threshold: default_offer_threshold(),
            greeting_gather: default_greeting_gather(),
            followup_gather: default_followup_gather(),
            callback_gather: default_callback_gather(),
        }
    }
}

/// Knowledge chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    knowledge::MAX_CHUNK_CHARS
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// OTLP endpoint for traces (requires the `telemetry` feature)
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            otlp_endpoint: None,
            metrics_enabled: true,
        }
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "voice_call".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_ai_backend()?;
        self.validate_session()?;
        self.validate_conversation()?;
        self.validate_knowledge()?;
        self.validate_telephony()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "Port must be non-zero"));
        }

        if self.environment.is_production() && self.server.cors_enabled && self.server.cors_origins.is_empty() {
            tracing::warn!("CORS enabled in production with no allowed origins; all origins are rejected");
        }

        Ok(())
    }

    fn validate_ai_backend(&self) -> Result<(), ConfigError> {
        let timeout = self.ai_backend.timeout_ms;
        if timeout == 0 || timeout > timeouts::AI_BACKEND_MAX_MS {
            return Err(invalid(
                "ai_backend.timeout_ms",
                format!("Must be between 1 and {}, got {}", timeouts::AI_BACKEND_MAX_MS, timeout),
            ));
        }

        if self.ai_backend.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("ai_backend.endpoint".to_string()));
        }

        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        let session = &self.session;

        if session.history_limit == 0 {
            return Err(invalid("session.history_limit", "Must be at least 1"));
        }

        if session.max_sessions == 0 {
            return Err(invalid("session.max_sessions", "Must be at least 1"));
        }

        if session.sweep_interval_secs == 0 || session.sweep_interval_secs > session.max_age_secs {
            return Err(invalid(
                "session.sweep_interval_secs",
                format!(
                    "Must be between 1 and max_age_secs ({}), got {}",
                    session.max_age_secs, session.sweep_interval_secs
                ),
            ));
        }

        Ok(())
    }

    fn validate_conversation(&self) -> Result<(), ConfigError> {
        let conversation = &self.conversation;

        if conversation.escalation_offer_threshold == 0 {
            return Err(invalid("conversation.escalation_offer_threshold", "Must be at least 1"));
        }

        if conversation
            .escalation_keywords
            .iter()
            .all(|k| k.trim().is_empty())
        {
            return Err(invalid(
                "conversation.escalation_keywords",
                "At least one non-empty keyword is required",
            ));
        }

        Ok(())
    }

    fn validate_knowledge(&self) -> Result<(), ConfigError> {
        if self.knowledge.max_chunk_chars < knowledge::MIN_CHUNK_CHARS {
            return Err(invalid(
                "knowledge.max_chunk_chars",
                format!(
                    "Must be at least {}, got {}",
                    knowledge::MIN_CHUNK_CHARS,
                    self.knowledge.max_chunk_chars
                ),
            ));
        }
        Ok(())
    }

    fn validate_telephony(&self) -> Result<(), ConfigError> {
        let telephony = &self.telephony;

        if telephony.default_country_code.is_empty()
            || !telephony.default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid(
                "telephony.default_country_code",
                "Must be digits only, without '+'",
            ));
        }

        if self.environment.is_production() {
            if !telephony.has_credentials() {
                return Err(ConfigError::MissingField(
                    "telephony.account_sid / auth_token / from_number".to_string(),
                ));
            }
            if self.server.public_base_url.contains("localhost") {
                return Err(invalid(
                    "server.public_base_url",
                    "Must be publicly reachable in production",
                ));
            }
        } else if !telephony.has_credentials() {
            tracing::warn!("Telephony credentials not configured; outbound calls will fail");
        }

        Ok(())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (VOICE_CALL__ prefix, `__` separated)
/// 2. config/{env}.yaml|toml (if env specified)
/// 3. config/default.yaml|toml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit configuration directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_CALL")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("conversation.escalation_keywords")
            .with_list_parse_key("persistence.scylla_hosts")
            .with_list_parse_key("server.cors_origins")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.ai_backend.timeout_ms, 8000);
        assert_eq!(settings.session.max_age_secs, 3600);
        assert_eq!(settings.session.sweep_interval_secs, 600);
        assert_eq!(settings.session.history_limit, 10);
        assert_eq!(settings.conversation.escalation_offer_threshold, 5);
        assert_eq!(settings.conversation.escalation_keywords.len(), 8);
        assert_eq!(settings.knowledge.max_chunk_chars, 1500);
        assert_eq!(settings.telephony.bridge_timeout_secs, 30);
        assert_eq!(settings.telephony.default_country_code, "91");
    }

    #[test]
    fn test_default_settings_validate() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_ai_timeout_bounds() {
        let mut settings = Settings::default();
        settings.ai_backend.timeout_ms = 0;
        assert!(settings.validate_ai_backend().is_err());

        settings.ai_backend.timeout_ms = 20_000;
        assert!(settings.validate_ai_backend().is_err());

        settings.ai_backend.timeout_ms = 8_000;
        assert!(settings.validate_ai_backend().is_ok());
    }

    #[test]
    fn test_session_validation() {
        let mut settings = Settings::default();
        settings.session.sweep_interval_secs = settings.session.max_age_secs + 1;
        assert!(settings.validate_session().is_err());

        settings.session.sweep_interval_secs = 60;
        settings.session.history_limit = 0;
        assert!(settings.validate_session().is_err());
    }

    #[test]
    fn test_conversation_validation() {
        let mut settings = Settings::default();
        settings.conversation.escalation_keywords = vec!["  ".to_string()];
        assert!(settings.validate_conversation().is_err());

        settings.conversation.escalation_keywords = vec!["human".to_string()];
        settings.conversation.escalation_offer_threshold = 0;
        assert!(settings.validate_conversation().is_err());
    }

    #[test]
    fn test_chunk_size_minimum() {
        let mut settings = Settings::default();
        settings.knowledge.max_chunk_chars = 50;
        assert!(settings.validate_knowledge().is_err());
    }

    #[test]
    fn test_production_requires_credentials() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        settings.telephony.account_sid = String::new();
        assert!(settings.validate_telephony().is_err());

        settings.telephony.account_sid = "AC123".to_string();
        settings.telephony.auth_token = "secret".to_string();
        settings.telephony.from_number = "+15550001111".to_string();
        settings.server.public_base_url = "https://calls.example.com".to_string();
        assert!(settings.validate_telephony().is_ok());
    }

    #[test]
    fn test_country_code_digits_only() {
        let mut settings = Settings::default();
        settings.telephony.default_country_code = "+91".to_string();
        assert!(settings.validate_telephony().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[conversation]
escalation_offer_threshold = 3
escalation_keywords = ["operator"]

[session]
history_limit = 4
"#
        )
        .unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), None).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.conversation.escalation_offer_threshold, 3);
        assert_eq!(settings.conversation.escalation_keywords, vec!["operator"]);
        assert_eq!(settings.session.history_limit, 4);
        assert_eq!(settings.ai_backend.timeout_ms, 8000);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[knowledge]\nmax_chunk_chars = 10\n",
        )
        .unwrap();
        assert!(load_settings_from(dir.path().to_str().unwrap(), None).is_err());
    }
}
