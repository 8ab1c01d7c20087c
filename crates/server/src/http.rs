//! HTTP Endpoints
//!
//! Make-call API, telephony webhooks and operational endpoints.

use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use voice_call_agent::CallRequest;
use voice_call_config::constants::paths;

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::webhook;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins, state.config.server.cors_enabled);
    let timeout = Duration::from_secs(state.config.server.timeout_seconds.max(1));

    Router::new()
        // Call API
        .route(paths::MAKE_CALL, post(make_call))
        .route(paths::SESSIONS, get(session_stats))
        // Telephony webhooks
        .route(
            paths::HANDLE_CALL,
            post(webhook::handle_call).get(webhook::handle_call_liveness),
        )
        .route(paths::HANDLE_RESPONSE, post(webhook::handle_response))
        .route(paths::COLLECT_CALLBACK, post(webhook::collect_callback))
        .route(paths::STATUS_CALLBACK, post(webhook::status_callback))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, no cross-origin access is granted
/// - If cors_origins is empty, any origin is allowed (development)
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        return CorsLayer::new();
    }

    if origins.is_empty() {
        tracing::warn!("No CORS origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MakeCallData {
    call_sid: String,
    status: String,
    target_number: String,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct MakeCallResponse {
    success: bool,
    data: MakeCallData,
}

/// POST /api/voice/make-call
async fn make_call(
    State(state): State<AppState>,
    body: Result<Json<CallRequest>, JsonRejection>,
) -> Result<Json<MakeCallResponse>, ServerError> {
    let started = Instant::now();
    let result = place_call(&state, body).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    record_request("make_call", status, started.elapsed());
    result.map(Json)
}

async fn place_call(
    state: &AppState,
    body: Result<Json<CallRequest>, JsonRejection>,
) -> Result<MakeCallResponse, ServerError> {
    let Json(request) = body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let call = state.orchestrator.initiate_call(request).await?;

    Ok(MakeCallResponse {
        success: true,
        data: MakeCallData {
            call_sid: call.call_id,
            status: call.status.as_str().to_string(),
            target_number: call.target_number,
            message: "Voice call initiated successfully",
        },
    })
}

/// GET /api/voice/sessions
async fn session_stats(
    State(state): State<AppState>,
) -> Result<Json<voice_call_core::StoreStats>, ServerError> {
    state
        .sessions
        .stats()
        .await
        .map(Json)
        .map_err(|e| ServerError::Internal(e.to_string()))
}

/// Liveness: the process is up and the session store answers
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.sessions.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "environment": state.config.environment,
                "checks": {
                    "sessions": {
                        "status": "ok",
                        "active": stats.active_count,
                        "distributed": state.is_distributed_sessions(),
                    }
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "degraded",
                "version": env!("CARGO_PKG_VERSION"),
                "checks": {
                    "sessions": { "status": "error", "error": e.to_string() }
                }
            })),
        ),
    }
}

/// Readiness: the AI backend is reachable within the probe budget
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let probe_timeout = state.config.ai_backend.probe_timeout();

    let ai_status = match tokio::time::timeout(probe_timeout, state.backend.is_available()).await {
        Ok(true) => "ok",
        Ok(false) => "unreachable",
        Err(_) => "timeout",
    };
    let telephony_status = if state.config.telephony.has_credentials() {
        "ok"
    } else {
        "unconfigured"
    };

    let ready = ai_status == "ok";
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "ai_backend": {
                    "status": ai_status,
                    "url": state.config.ai_backend.endpoint,
                },
                "telephony": { "status": telephony_status },
            }
        })),
    )
}
