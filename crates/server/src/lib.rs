//! Voice Call Server
//!
//! Provides the make-call API, the telephony provider's webhooks and the
//! operational endpoints (health, readiness, metrics).

pub mod http;
pub mod metrics;
pub mod state;
pub mod webhook;

pub use http::create_router;
pub use metrics::{init_metrics, record_request, record_webhook};
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use voice_call_agent::AgentError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Failed to initiate voice call")]
    CallPlacement(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::CallPlacement(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidRequest(message) => ServerError::InvalidRequest(message),
            AgentError::Placement(e) => ServerError::CallPlacement(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

// JSON error envelope shared by the API endpoints
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServerError::CallPlacement(detail) => serde_json::json!({
                "success": false,
                "message": self.to_string(),
                "error": detail,
            }),
            _ => serde_json::json!({
                "success": false,
                "message": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
