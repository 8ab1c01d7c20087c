//! Outbound call placement
//!
//! Validates a make-call request, builds the session seed, asks the provider
//! to place the call and stores the session under the provider's call id.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use voice_call_config::{
    constants::{calls, paths},
    Settings,
};
use voice_call_core::{
    chunk_articles, mask_phone_number, normalize_phone_number, CallStatus, KnowledgeArticle,
    SessionSeed, VoiceSettings,
};
use voice_call_persistence::{CallLogRecord, CallLogStore};
use voice_call_transport::{OutboundCall, TelephonyProvider, TransportError};

use crate::error::AgentError;
use crate::payload::encode_for_url;
use crate::store::SessionStore;

/// Request to place an outbound call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(default)]
    pub target_number: String,
    #[serde(default, alias = "information")]
    pub call_information: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub escalation_number: Option<String>,
    #[serde(default)]
    pub voice_settings: Option<VoiceSettings>,
    /// Articles chunked into the AI backend's knowledge context
    #[serde(default)]
    pub knowledge_articles: Vec<KnowledgeArticle>,
}

impl CallRequest {
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.target_number.trim().is_empty() || self.call_information.trim().is_empty() {
            return Err(AgentError::InvalidRequest(
                "Target number and call information are required".to_string(),
            ));
        }
        let digits = self
            .target_number
            .trim()
            .trim_start_matches('+')
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect::<String>();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AgentError::InvalidRequest(format!(
                "Target number is not a phone number: {}",
                mask_phone_number(&self.target_number)
            )));
        }
        Ok(())
    }
}

/// Provider acknowledgement returned to the API caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedCall {
    pub call_id: String,
    pub status: CallStatus,
    pub target_number: String,
}

/// Orchestrator settings derived from [`Settings`]
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Externally reachable base URL for webhooks, without trailing slash
    pub public_base_url: String,
    pub from_number: String,
    pub country_code: String,
    pub max_chunk_chars: usize,
    pub max_payload_bytes: usize,
    pub placement_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            public_base_url: settings.server.public_base_url.trim_end_matches('/').to_string(),
            from_number: settings.telephony.from_number.clone(),
            country_code: settings.telephony.default_country_code.clone(),
            max_chunk_chars: settings.knowledge.max_chunk_chars,
            max_payload_bytes: settings.session.max_fallback_payload_bytes,
            placement_timeout: settings.telephony.request_timeout(),
        }
    }

    fn webhook_url(&self, payload: &str) -> String {
        format!(
            "{}{}?{}={}",
            self.public_base_url,
            paths::HANDLE_CALL,
            paths::PAYLOAD_QUERY_PARAM,
            payload
        )
    }

    fn status_callback_url(&self) -> String {
        format!("{}{}", self.public_base_url, paths::STATUS_CALLBACK)
    }
}

pub struct CallOrchestrator {
    provider: Arc<dyn TelephonyProvider>,
    store: Arc<dyn SessionStore>,
    call_logs: Arc<dyn CallLogStore>,
    settings: OrchestratorSettings,
}

impl CallOrchestrator {
    pub fn new(
        provider: Arc<dyn TelephonyProvider>,
        store: Arc<dyn SessionStore>,
        call_logs: Arc<dyn CallLogStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            store,
            call_logs,
            settings,
        }
    }

    /// Build the session seed for a validated request
    pub fn build_seed(&self, request: &CallRequest) -> SessionSeed {
        let company_name = request
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(calls::DEFAULT_COMPANY_NAME)
            .to_string();

        SessionSeed {
            company_id: request.company_id.clone().unwrap_or_default(),
            company_name,
            call_information: request.call_information.trim().to_string(),
            receiver_name: request
                .receiver_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            target_number: normalize_phone_number(&request.target_number, &self.settings.country_code),
            escalation_number: request
                .escalation_number
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            voice_settings: request.voice_settings.unwrap_or_default(),
            knowledge_chunks: chunk_articles(&request.knowledge_articles, self.settings.max_chunk_chars),
        }
    }

    /// Place an outbound call and register its session
    pub async fn initiate_call(&self, request: CallRequest) -> Result<InitiatedCall, AgentError> {
        request.validate()?;
        let seed = self.build_seed(&request);
        let (payload, dropped_chunks) = encode_for_url(&seed, self.settings.max_payload_bytes)?;
        if dropped_chunks {
            metrics::counter!("voice_call_payload_chunks_dropped_total").increment(1);
        }

        let outbound = OutboundCall {
            to: seed.target_number.clone(),
            from: self.settings.from_number.clone(),
            webhook_url: self.settings.webhook_url(&payload),
            status_callback_url: self.settings.status_callback_url(),
        };

        let placed = match tokio::time::timeout(
            self.settings.placement_timeout,
            self.provider.place_call(&outbound),
        )
        .await
        {
            Ok(Ok(placed)) => placed,
            Ok(Err(e)) => return Err(self.placement_failed(&seed, e)),
            Err(_) => return Err(self.placement_failed(&seed, TransportError::Timeout)),
        };

        // The call is already ringing, so a store failure only degrades to the fallback payload
        if let Err(e) = self.store.create(&placed.call_id, seed.clone()).await {
            tracing::warn!(call_id = %placed.call_id, error = %e, "Failed to store session, relying on fallback payload");
        }

        let record = CallLogRecord::started(
            seed.company_id.clone(),
            placed.call_id.clone(),
            self.settings.from_number.clone(),
            seed.target_number.clone(),
            seed.persona().display_name(),
            placed.status.as_str(),
        );
        if let Err(e) = self.call_logs.create(record).await {
            tracing::warn!(call_id = %placed.call_id, error = %e, "Failed to create call log");
        }

        metrics::counter!("voice_call_calls_placed_total", "persona" => seed.persona().as_str()).increment(1);
        tracing::info!(
            call_id = %placed.call_id,
            to = %mask_phone_number(&seed.target_number),
            persona = %seed.persona(),
            knowledge_chunks = seed.knowledge_chunks.len(),
            "Voice call initiated"
        );

        Ok(InitiatedCall {
            call_id: placed.call_id,
            status: placed.status,
            target_number: seed.target_number,
        })
    }

    fn placement_failed(&self, seed: &SessionSeed, error: TransportError) -> AgentError {
        metrics::counter!("voice_call_placement_failures_total").increment(1);
        tracing::error!(
            to = %mask_phone_number(&seed.target_number),
            error = %error,
            "Call placement failed"
        );
        AgentError::Placement(error)
    }
}
