//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use voice_call_agent::{
    CallOrchestrator, ConversationEngine, InMemorySessionStore, LifecycleReconciler,
    OrchestratorSettings, SessionStore,
};
use voice_call_config::Settings;
use voice_call_llm::AiBackend;
use voice_call_persistence::{CallLogStore, InMemoryCallLogStore};
use voice_call_transport::TelephonyProvider;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Settings are read-only after startup
    pub config: Arc<Settings>,
    pub sessions: Arc<dyn SessionStore>,
    pub call_logs: Arc<dyn CallLogStore>,
    pub backend: Arc<dyn AiBackend>,
    pub orchestrator: Arc<CallOrchestrator>,
    pub engine: Arc<ConversationEngine>,
    pub reconciler: Arc<LifecycleReconciler>,
}

impl AppState {
    /// Wire the components around an in-memory session store and call log
    pub fn new(
        config: Settings,
        provider: Arc<dyn TelephonyProvider>,
        backend: Arc<dyn AiBackend>,
    ) -> Self {
        let call_logs: Arc<dyn CallLogStore> = Arc::new(InMemoryCallLogStore::new());
        Self::with_call_logs(config, provider, backend, call_logs)
    }

    /// Wire the components with an explicit call log store (e.g. ScyllaDB)
    pub fn with_call_logs(
        config: Settings,
        provider: Arc<dyn TelephonyProvider>,
        backend: Arc<dyn AiBackend>,
        call_logs: Arc<dyn CallLogStore>,
    ) -> Self {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(
            config.session.history_limit,
            config.session.max_sessions,
        ));

        let orchestrator = CallOrchestrator::new(
            provider,
            sessions.clone(),
            call_logs.clone(),
            OrchestratorSettings::from_settings(&config),
        );
        let engine =
            ConversationEngine::from_settings(&config, sessions.clone(), backend.clone(), call_logs.clone());
        let reconciler = LifecycleReconciler::new(sessions.clone(), call_logs.clone());

        Self {
            config: Arc::new(config),
            sessions,
            call_logs,
            backend,
            orchestrator: Arc::new(orchestrator),
            engine: Arc::new(engine),
            reconciler: Arc::new(reconciler),
        }
    }

    pub fn is_distributed_sessions(&self) -> bool {
        self.sessions.is_distributed()
    }
}
