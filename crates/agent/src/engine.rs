//! Conversation engine
//!
//! Turns one webhook delivery into a [`Decision`]. The engine is stateless
//! between invocations: everything it knows about a call is read from the
//! session store, and the conversational "state" is inferred from the
//! exchange count and the utterance.
//!
//! Call-log writes made here are best effort. They run on spawned tasks so a
//! slow log backend never delays the reply to the provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use voice_call_config::{constants::lines, Settings};
use voice_call_core::{detect_language, CallSession, PersonaId};
use voice_call_llm::{with_deadline, AiBackend, AiTurnRequest, LlmError};
use voice_call_persistence::{CallLogStore, CallLogUpdate, HandledBy};

use crate::payload::decode_seed;
use crate::policy::{ConversationPolicy, Decision, TurnPlan};
use crate::store::SessionStore;

pub const TRANSFER_REASON: &str = "caller requested transfer";
pub const CALLBACK_REASON: &str = "callback requested";

/// Decision for one webhook, with the persona whose voice renders it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub persona: PersonaId,
    pub decision: Decision,
}

impl Reply {
    fn new(persona: PersonaId, decision: Decision) -> Self {
        Self { persona, decision }
    }
}

pub struct ConversationEngine {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn AiBackend>,
    call_logs: Arc<dyn CallLogStore>,
    policy: ConversationPolicy,
    ai_timeout: Duration,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AiBackend>,
        call_logs: Arc<dyn CallLogStore>,
        policy: ConversationPolicy,
        ai_timeout: Duration,
    ) -> Self {
        Self {
            store,
            backend,
            call_logs,
            policy,
            ai_timeout,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn AiBackend>,
        call_logs: Arc<dyn CallLogStore>,
    ) -> Self {
        Self::new(
            store,
            backend,
            call_logs,
            ConversationPolicy::from_settings(settings),
            settings.ai_backend.timeout(),
        )
    }

    pub fn policy(&self) -> &ConversationPolicy {
        &self.policy
    }

    /// Connect webhook: the callee answered.
    ///
    /// A session missing from the store is re-created from the fallback
    /// payload when one is supplied and decodes.
    pub async fn on_connect(&self, call_id: &str, fallback_payload: Option<&str>) -> Reply {
        if let Some(session) = self.load(call_id).await {
            return self.greet(&session);
        }

        let Some(payload) = fallback_payload.filter(|p| !p.trim().is_empty()) else {
            tracing::warn!(call_id = %call_id, "No session and no fallback payload, using generic greeting");
            return Reply::new(PersonaId::default(), self.policy.greet(None));
        };

        let seed = match decode_seed(payload) {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!(call_id = %call_id, error = %e, "Fallback payload rejected, using generic greeting");
                return Reply::new(PersonaId::default(), self.policy.greet(None));
            },
        };

        if let Err(e) = self.store.create(call_id, seed.clone()).await {
            tracing::warn!(call_id = %call_id, error = %e, "Failed to store re-seeded session");
        } else {
            metrics::counter!("voice_call_sessions_reseeded_total").increment(1);
            tracing::info!(call_id = %call_id, "Session re-seeded from fallback payload");
        }

        let persona = seed.persona();
        Reply::new(persona, self.policy.greet(Some(&seed)))
    }

    fn greet(&self, session: &CallSession) -> Reply {
        Reply::new(session.seed.persona(), self.policy.greet(Some(&session.seed)))
    }

    /// Turn webhook: the caller said something (or nothing)
    pub async fn on_turn(&self, call_id: &str, utterance: &str) -> Reply {
        let Some(session) = self.load(call_id).await else {
            tracing::warn!(call_id = %call_id, "Turn for unknown session");
            let reply = Reply::new(PersonaId::default(), Decision::terminate(lines::SESSION_MISSING_APOLOGY));
            record_decision(&reply.decision);
            return reply;
        };
        let persona = session.seed.persona();
        let utterance = utterance.trim();

        let decision = match self.policy.decide_turn(utterance, &session.seed) {
            TurnPlan::ConsultBackend => self.continue_with_ai(&session, utterance).await,
            TurnPlan::Decided(decision) => {
                match &decision {
                    Decision::Escalate { .. } => {
                        tracing::info!(call_id = %call_id, "Caller requested a human, transferring");
                        self.record(call_id, CallLogUpdate::escalated(TRANSFER_REASON));
                    },
                    Decision::CollectCallback => {
                        tracing::info!(call_id = %call_id, "Caller requested a human, no escalation number");
                    },
                    _ => {},
                }
                decision
            },
        };

        record_decision(&decision);
        Reply::new(persona, decision)
    }

    async fn continue_with_ai(&self, session: &CallSession, utterance: &str) -> Decision {
        let call_id = session.call_id.as_str();
        let request = AiTurnRequest::from_session(session, utterance);

        let started = Instant::now();
        let result = with_deadline(self.ai_timeout, self.backend.respond(&request)).await;
        metrics::histogram!("voice_call_ai_latency_seconds").record(started.elapsed().as_secs_f64());

        let reply = match result {
            Ok(reply) if !reply.ai_response.trim().is_empty() => reply,
            Ok(_) => return self.backend_failed(session, &LlmError::InvalidResponse("empty reply".to_string())),
            Err(e) => return self.backend_failed(session, &e),
        };

        let language = reply
            .language()
            .unwrap_or_else(|| detect_language(utterance, session.seed.language_mode()));

        if let Err(e) = self
            .store
            .append_exchange(call_id, utterance, &reply.ai_response, language)
            .await
        {
            tracing::warn!(call_id = %call_id, error = %e, "Failed to append exchange");
        }

        if reply.abusive_detected {
            tracing::warn!(call_id = %call_id, "AI backend flagged abusive content");
            self.record(call_id, CallLogUpdate::abuse());
        }

        self.policy
            .after_reply(reply.ai_response, session.exchange_count.saturating_add(1))
    }

    fn backend_failed(&self, session: &CallSession, error: &LlmError) -> Decision {
        metrics::counter!("voice_call_ai_failures_total", "kind" => error.kind()).increment(1);
        tracing::error!(
            call_id = %session.call_id,
            error = %error,
            "AI backend failed, ending call with fallback line"
        );
        self.policy.on_backend_failure(session.seed.persona())
    }

    /// Callback-collection webhook: the caller left contact details
    pub async fn on_callback(&self, call_id: &str, details: &str) -> Reply {
        let persona = self
            .load(call_id)
            .await
            .map(|s| s.seed.persona())
            .unwrap_or_default();

        let details = details.trim();
        if details.is_empty() {
            tracing::info!(call_id = %call_id, "Callback requested without details");
        } else {
            self.record(
                call_id,
                CallLogUpdate {
                    callback_details: Some(details.to_string()),
                    handled_by: Some(HandledBy::Human),
                    escalation_reason: Some(CALLBACK_REASON.to_string()),
                    ..CallLogUpdate::default()
                },
            );
        }

        let decision = Decision::terminate(lines::CALLBACK_CONFIRMED);
        record_decision(&decision);
        Reply::new(persona, decision)
    }

    /// Store errors are treated as a missing session
    async fn load(&self, call_id: &str) -> Option<CallSession> {
        match self.store.get(call_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(call_id = %call_id, error = %e, "Session lookup failed");
                None
            },
        }
    }

    fn record(&self, call_id: &str, update: CallLogUpdate) {
        let call_logs = Arc::clone(&self.call_logs);
        let call_id = call_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = call_logs.update(&call_id, update).await {
                tracing::warn!(call_id = %call_id, error = %e, "Call log update failed");
            }
        });
    }
}

fn record_decision(decision: &Decision) {
    metrics::counter!("voice_call_turns_total", "decision" => decision.kind()).increment(1);
}
