//! AI backend implementations
//!
//! The conversation engine depends only on [`AiBackend`]; [`HttpAiBackend`]
//! talks to the external inference service over JSON/HTTP.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use crate::types::{AiReply, AiTurnRequest};
use crate::LlmError;

/// Path of the voice turn endpoint, relative to the backend base URL
const VOICE_RESPONSE_PATH: &str = "/voice/voice-response";
const HEALTH_PATH: &str = "/health";

/// AI backend trait
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Produce the reply for one caller turn
    async fn respond(&self, request: &AiTurnRequest<'_>) -> Result<AiReply, LlmError>;

    /// Check whether the backend is reachable
    async fn is_available(&self) -> bool;
}

/// HTTP backend configuration
#[derive(Debug, Clone)]
pub struct AiBackendSettings {
    /// Base URL, without trailing slash
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
    /// Timeout for availability probes
    pub probe_timeout: Duration,
}

impl Default for AiBackendSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            timeout: Duration::from_millis(8000),
            probe_timeout: Duration::from_millis(2000),
        }
    }
}

/// AI backend reached over HTTP
pub struct HttpAiBackend {
    client: Client,
    settings: AiBackendSettings,
}

impl HttpAiBackend {
    /// Create a new HTTP backend
    pub fn new(mut settings: AiBackendSettings) -> Result<Self, LlmError> {
        settings.endpoint = settings.endpoint.trim_end_matches('/').to_string();
        if settings.endpoint.is_empty() {
            return Err(LlmError::Configuration("AI backend endpoint is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.settings.endpoint, path)
    }
}

#[async_trait]
impl AiBackend for HttpAiBackend {
    async fn respond(&self, request: &AiTurnRequest<'_>) -> Result<AiReply, LlmError> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.api_url(VOICE_RESPONSE_PATH))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: AiReply = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if reply.ai_response.trim().is_empty() {
            return Err(LlmError::InvalidResponse("empty ai_response".to_string()));
        }

        tracing::debug!(
            call_id = %request.call_sid,
            elapsed_ms = start.elapsed().as_millis() as u64,
            language = ?reply.detected_language,
            confidence = ?reply.confidence,
            "AI backend replied"
        );

        Ok(reply)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url(HEALTH_PATH))
            .timeout(self.settings.probe_timeout)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
