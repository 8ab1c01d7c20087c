//! Prometheus metrics
//!
//! The recorder is installed once at startup; until then every `metrics`
//! macro is a no-op, which keeps handlers usable in tests.

use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder; later calls return the existing handle
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(PROMETHEUS.get_or_init(|| handle).clone()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            None
        },
    }
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// API request outcome
pub fn record_request(endpoint: &'static str, status: StatusCode, elapsed: Duration) {
    ::metrics::counter!(
        "voice_call_http_requests_total",
        "endpoint" => endpoint,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    ::metrics::histogram!("voice_call_http_request_seconds", "endpoint" => endpoint)
        .record(elapsed.as_secs_f64());
}

/// Webhook delivery from the telephony provider
pub fn record_webhook(kind: &'static str, elapsed: Duration) {
    ::metrics::counter!("voice_call_webhooks_total", "kind" => kind).increment(1);
    ::metrics::histogram!("voice_call_webhook_seconds", "kind" => kind).record(elapsed.as_secs_f64());
}
