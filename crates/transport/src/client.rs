//! Outbound call placement

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use voice_call_core::CallStatus;

use crate::TransportError;

/// Status events subscribed for every placed call
pub const STATUS_CALLBACK_EVENTS: [&str; 3] = ["completed", "failed", "no-answer"];

/// Parameters of a call placement request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    /// Destination, E.164
    pub to: String,
    /// Origination number
    pub from: String,
    /// Connect webhook, including the fallback payload query
    pub webhook_url: String,
    pub status_callback_url: String,
}

/// Provider acknowledgement of a placed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub call_id: String,
    pub status: CallStatus,
}

/// Telephony provider trait
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Ask the provider to place an outbound call
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TransportError>;
}

/// Twilio account configuration
#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    /// REST API base, without trailing slash
    pub api_base_url: String,
    pub timeout: Duration,
}

/// Twilio REST client
pub struct TwilioClient {
    client: Client,
    settings: TwilioSettings,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl TwilioClient {
    pub fn new(mut settings: TwilioSettings) -> Result<Self, TransportError> {
        settings.api_base_url = settings.api_base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TransportError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.settings.api_base_url, self.settings.account_sid
        )
    }
}

#[async_trait]
impl TelephonyProvider for TwilioClient {
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TransportError> {
        if self.settings.account_sid.is_empty() || self.settings.auth_token.is_empty() {
            return Err(TransportError::Configuration(
                "Telephony credentials are not configured".to_string(),
            ));
        }

        let mut form: Vec<(&str, &str)> = vec![
            ("To", call.to.as_str()),
            ("From", call.from.as_str()),
            ("Url", call.webhook_url.as_str()),
            ("Method", "POST"),
            ("StatusCallback", call.status_callback_url.as_str()),
            ("StatusCallbackMethod", "POST"),
        ];
        form.extend(STATUS_CALLBACK_EVENTS.iter().map(|e| ("StatusCallbackEvent", *e)));

        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            return Err(TransportError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let resource: CallResource = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        Ok(PlacedCall {
            call_id: resource.sid,
            status: resource
                .status
                .as_deref()
                .map(CallStatus::parse)
                .unwrap_or(CallStatus::Queued),
        })
    }
}
