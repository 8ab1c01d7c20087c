//! Session store
//!
//! Webhook deliveries are independent HTTP requests, so conversational state
//! is looked up by call id on every turn. The store is the only shared
//! mutable state in the service; [`SessionStore`] lets it be backed by an
//! external key-value store without touching call sites.
//!
//! - `InMemorySessionStore` - Default, process-local `DashMap`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use voice_call_core::{CallSession, Error, Exchange, Language, Result, SessionSeed, StoreStats};

/// Session store trait for pluggable backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a session; an existing entry for the same call id is replaced
    async fn create(&self, call_id: &str, seed: SessionSeed) -> Result<()>;

    /// Current state, or `None` when the call is unknown
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>>;

    /// Append an exchange and bump the exchange count; no-op for unknown calls
    async fn append_exchange(
        &self,
        call_id: &str,
        user_utterance: &str,
        ai_utterance: &str,
        language: Language,
    ) -> Result<()>;

    /// Remove a session, returning whether it existed
    async fn remove(&self, call_id: &str) -> Result<bool>;

    /// Remove sessions created more than `max_age` ago
    async fn sweep_expired(&self, max_age: Duration) -> Result<usize>;

    async fn stats(&self) -> Result<StoreStats>;

    /// Whether state is shared across service instances
    fn is_distributed(&self) -> bool;
}

/// Process-local session store
///
/// Each mutation holds only the shard lock of its own key, so calls in
/// flight do not contend with each other.
pub struct InMemorySessionStore {
    sessions: DashMap<String, CallSession>,
    history_limit: usize,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new(history_limit: usize, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            history_limit: history_limit.max(1),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove sessions created strictly before `cutoff`
    pub fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = session.created_at >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Insert a fully built session, keeping its timestamps
    ///
    /// `max_sessions` is a soft bound: exceeding it is logged and counted,
    /// never enforced by eviction. Sessions leave the store only through
    /// `remove` or the age sweep.
    pub fn insert(&self, session: CallSession) {
        let is_new = !self.sessions.contains_key(&session.call_id);
        self.sessions.insert(session.call_id.clone(), session);
        let active = self.sessions.len();
        if is_new && active > self.max_sessions {
            metrics::counter!("voice_call_sessions_over_capacity_total").increment(1);
            tracing::warn!(active, max = self.max_sessions, "Session store above soft capacity");
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(10, 1_000)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, call_id: &str, seed: SessionSeed) -> Result<()> {
        self.insert(CallSession::new(call_id, seed));
        tracing::debug!(
            call_id = %call_id,
            active = self.sessions.len(),
            "Session stored"
        );
        Ok(())
    }

    async fn get(&self, call_id: &str) -> Result<Option<CallSession>> {
        Ok(self.sessions.get(call_id).map(|entry| entry.value().clone()))
    }

    async fn append_exchange(
        &self,
        call_id: &str,
        user_utterance: &str,
        ai_utterance: &str,
        language: Language,
    ) -> Result<()> {
        if let Some(mut session) = self.sessions.get_mut(call_id) {
            session.push_exchange(
                Exchange::new(user_utterance, ai_utterance, language),
                self.history_limit,
            );
        }
        Ok(())
    }

    async fn remove(&self, call_id: &str) -> Result<bool> {
        Ok(self.sessions.remove(call_id).is_some())
    }

    async fn sweep_expired(&self, max_age: Duration) -> Result<usize> {
        let max_age = chrono::Duration::from_std(max_age).map_err(|e| Error::Store(e.to_string()))?;
        Ok(self.sweep_older_than(Utc::now() - max_age))
    }

    async fn stats(&self) -> Result<StoreStats> {
        let now = Utc::now();
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().summary(now))
            .collect();
        Ok(StoreStats {
            active_count: sessions.len(),
            sessions,
        })
    }

    fn is_distributed(&self) -> bool {
        false
    }
}

/// Start the periodic sweep of stale sessions.
///
/// Returns a shutdown sender; sending `true` stops the task.
pub fn spawn_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    max_age: Duration,
) -> watch::Sender<bool> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    match store.sweep_expired(max_age).await {
                        Ok(0) => {},
                        Ok(removed) => {
                            metrics::counter!("voice_call_sessions_swept_total").increment(removed as u64);
                            tracing::info!(removed, "Session sweep removed stale sessions");
                        },
                        Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Session sweeper shutting down");
                        break;
                    }
                }
            }
        }
    });

    shutdown_tx
}
