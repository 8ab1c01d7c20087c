//! Call lifecycle reconciliation
//!
//! Terminal status callbacks finalize the call log and evict the session.
//! This is the only eviction path besides the age-based sweep.

use std::sync::Arc;

use chrono::Utc;
use voice_call_core::CallStatus;
use voice_call_persistence::{CallLogStore, CallLogUpdate};

use crate::store::SessionStore;

/// What a status callback did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Non-terminal status, acknowledged only
    Ignored,
    /// Terminal status; `session_removed` is false when the session was already gone
    Finalized { session_removed: bool },
}

pub struct LifecycleReconciler {
    store: Arc<dyn SessionStore>,
    call_logs: Arc<dyn CallLogStore>,
}

impl LifecycleReconciler {
    pub fn new(store: Arc<dyn SessionStore>, call_logs: Arc<dyn CallLogStore>) -> Self {
        Self { store, call_logs }
    }

    pub async fn on_status_update(
        &self,
        call_id: &str,
        status: &CallStatus,
        duration_secs: Option<u32>,
    ) -> StatusOutcome {
        if !status.is_terminal() {
            tracing::debug!(call_id = %call_id, status = %status.as_str(), "Non-terminal status acknowledged");
            return StatusOutcome::Ignored;
        }

        let transcript = match self.store.get(call_id).await {
            Ok(Some(session)) => Some(session.transcript()).filter(|t| !t.is_empty()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(call_id = %call_id, error = %e, "Session lookup failed during finalization");
                None
            },
        };

        let update = CallLogUpdate {
            end_time: Some(Utc::now()),
            duration_secs,
            status: Some(status.as_str().to_string()),
            transcript,
            ..CallLogUpdate::default()
        };
        if let Err(e) = self.call_logs.update(call_id, update).await {
            tracing::warn!(call_id = %call_id, error = %e, "Failed to finalize call log");
        }

        let session_removed = match self.store.remove(call_id).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(call_id = %call_id, error = %e, "Failed to remove session");
                false
            },
        };

        metrics::counter!("voice_call_calls_finished_total", "status" => status.as_str().to_string())
            .increment(1);
        tracing::info!(
            call_id = %call_id,
            status = %status.as_str(),
            duration_secs = duration_secs.unwrap_or(0),
            session_removed,
            "Call finished"
        );

        StatusOutcome::Finalized { session_removed }
    }
}
