//! Voice call session orchestration
//!
//! Features:
//! - Session store keyed by call id, with age-based sweep
//! - Fallback session payload carried in the connect webhook URL
//! - Conversation policy: escalation keywords, escalation offer, persona fallbacks
//! - Conversation engine driving the AI backend per turn under a hard deadline
//! - Outbound call placement and lifecycle reconciliation on status callbacks

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod payload;
pub mod policy;
pub mod reconciler;
pub mod store;

pub use engine::{ConversationEngine, Reply, CALLBACK_REASON, TRANSFER_REASON};
pub use error::AgentError;
pub use orchestrator::{CallOrchestrator, CallRequest, InitiatedCall, OrchestratorSettings};
pub use payload::{decode_seed, encode_for_url, encode_seed};
pub use policy::{ConversationPolicy, Decision, TurnPlan};
pub use reconciler::{LifecycleReconciler, StatusOutcome};
pub use store::{spawn_sweeper, InMemorySessionStore, SessionStore};
