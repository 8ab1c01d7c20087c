//! End-to-end call flow tests
//!
//! Drive placement, webhook turns and status callbacks against fake
//! telephony and AI backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use voice_call_agent::{
    decode_seed, AgentError, CallOrchestrator, CallRequest, ConversationEngine, ConversationPolicy,
    Decision, InMemorySessionStore, LifecycleReconciler, OrchestratorSettings, SessionStore,
    StatusOutcome, CALLBACK_REASON, TRANSFER_REASON,
};
use voice_call_config::constants::lines;
use voice_call_core::{CallStatus, KnowledgeArticle, LanguageMode, PersonaId, VoiceSettings};
use voice_call_llm::{AiBackend, AiReply, AiTurnRequest, LlmError};
use voice_call_persistence::{CallLogRecord, CallLogStore, HandledBy, InMemoryCallLogStore};
use voice_call_transport::{OutboundCall, PlacedCall, TelephonyProvider, TransportError};

#[derive(Default)]
struct FakeProvider {
    placed: Mutex<Vec<OutboundCall>>,
    fail: bool,
}

#[async_trait]
impl TelephonyProvider for FakeProvider {
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TransportError> {
        if self.fail {
            return Err(TransportError::Provider {
                status: 400,
                message: "Invalid 'To' Phone Number".to_string(),
            });
        }
        let mut placed = self.placed.lock();
        placed.push(call.clone());
        Ok(PlacedCall {
            call_id: format!("CA{}", placed.len()),
            status: CallStatus::Queued,
        })
    }
}

#[derive(Clone, Copy)]
enum BackendMode {
    Reply { abusive: bool },
    Hang,
    Fail,
}

struct FakeBackend {
    mode: BackendMode,
    seen_counts: Mutex<Vec<u32>>,
}

impl FakeBackend {
    fn new(mode: BackendMode) -> Self {
        Self {
            mode,
            seen_counts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AiBackend for FakeBackend {
    async fn respond(&self, request: &AiTurnRequest<'_>) -> Result<AiReply, LlmError> {
        self.seen_counts.lock().push(request.call_data.exchange_count);
        match self.mode {
            BackendMode::Reply { abusive } => Ok(AiReply {
                ai_response: format!("You said: {}", request.user_message),
                abusive_detected: abusive,
                ..AiReply::default()
            }),
            BackendMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(LlmError::Network("unreachable".to_string()))
            },
            BackendMode::Fail => Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            }),
        }
    }

    async fn is_available(&self) -> bool {
        !matches!(self.mode, BackendMode::Fail)
    }
}

struct Harness {
    provider: Arc<FakeProvider>,
    backend: Arc<FakeBackend>,
    store: Arc<InMemorySessionStore>,
    logs: Arc<InMemoryCallLogStore>,
    orchestrator: CallOrchestrator,
    engine: ConversationEngine,
    reconciler: LifecycleReconciler,
}

fn orchestrator_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        public_base_url: "https://calls.example.com".to_string(),
        from_number: "+15550001111".to_string(),
        country_code: "91".to_string(),
        max_chunk_chars: 1_500,
        max_payload_bytes: 3_000,
        placement_timeout: Duration::from_secs(10),
    }
}

fn harness_with(provider: FakeProvider, mode: BackendMode) -> Harness {
    let provider = Arc::new(provider);
    let backend = Arc::new(FakeBackend::new(mode));
    let store = Arc::new(InMemorySessionStore::new(10, 1_000));
    let logs = Arc::new(InMemoryCallLogStore::new());

    let orchestrator = CallOrchestrator::new(
        provider.clone(),
        store.clone(),
        logs.clone(),
        orchestrator_settings(),
    );
    let engine = ConversationEngine::new(
        store.clone(),
        backend.clone(),
        logs.clone(),
        ConversationPolicy::default(),
        Duration::from_secs(8),
    );
    let reconciler = LifecycleReconciler::new(store.clone(), logs.clone());

    Harness {
        provider,
        backend,
        store,
        logs,
        orchestrator,
        engine,
        reconciler,
    }
}

fn harness(mode: BackendMode) -> Harness {
    harness_with(FakeProvider::default(), mode)
}

fn request() -> CallRequest {
    CallRequest {
        target_number: "9876543210".to_string(),
        call_information: "Your broadband plan renews next week.".to_string(),
        company_name: Some("Acme Telecom".to_string()),
        company_id: Some("company-7".to_string()),
        receiver_name: Some("Asha".to_string()),
        escalation_number: None,
        voice_settings: Some(VoiceSettings {
            personality: PersonaId::Ekta,
            language: LanguageMode::Auto,
        }),
        knowledge_articles: vec![KnowledgeArticle {
            title: "Plans".to_string(),
            content: "Basic plan is 499 per month.\n\nPremium plan is 999 per month.".to_string(),
            category: "pricing".to_string(),
        }],
    }
}

fn payload_from(url: &str) -> String {
    url.split_once("?data=")
        .map(|(_, data)| data.to_string())
        .expect("webhook url carries payload")
}

/// Call-log writes from the engine run on spawned tasks
async fn wait_for_log<F>(logs: &InMemoryCallLogStore, call_id: &str, check: F)
where
    F: Fn(&CallLogRecord) -> bool,
{
    for _ in 0..100 {
        if let Ok(Some(record)) = logs.get(call_id).await {
            if check(&record) {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("call log for {call_id} never matched");
}

#[tokio::test]
async fn test_initiate_call_registers_session_and_log() {
    let h = harness(BackendMode::Reply { abusive: false });
    let call = h.orchestrator.initiate_call(request()).await.unwrap();

    assert_eq!(call.call_id, "CA1");
    assert_eq!(call.status, CallStatus::Queued);
    assert_eq!(call.target_number, "+919876543210");

    let placed = h.provider.placed.lock().clone();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].to, "+919876543210");
    assert_eq!(placed[0].from, "+15550001111");
    assert!(placed[0]
        .webhook_url
        .starts_with("https://calls.example.com/api/voice/handle-call?data="));
    assert_eq!(
        placed[0].status_callback_url,
        "https://calls.example.com/api/voice/handle-call/status"
    );

    let session = h.store.get("CA1").await.unwrap().unwrap();
    assert_eq!(session.seed.company_name, "Acme Telecom");
    assert_eq!(session.seed.persona(), PersonaId::Ekta);
    assert_eq!(session.seed.knowledge_chunks.len(), 1);

    let record = h.logs.get("CA1").await.unwrap().unwrap();
    assert_eq!(record.bot_name, "Ekta");
    assert_eq!(record.company_id, "company-7");
    assert_eq!(record.handled_by, HandledBy::Ai);
    assert_eq!(record.status, "queued");
}

#[tokio::test]
async fn test_missing_fields_rejected_before_placement() {
    let h = harness(BackendMode::Reply { abusive: false });
    let mut missing_info = request();
    missing_info.call_information = "  ".to_string();

    let err = h.orchestrator.initiate_call(missing_info).await.unwrap_err();
    assert!(matches!(err, AgentError::InvalidRequest(_)));

    let mut bad_number = request();
    bad_number.target_number = "call me maybe".to_string();
    let err = h.orchestrator.initiate_call(bad_number).await.unwrap_err();
    assert!(matches!(err, AgentError::InvalidRequest(_)));

    assert!(h.provider.placed.lock().is_empty());
}

#[tokio::test]
async fn test_placement_failure_stores_nothing() {
    let h = harness_with(
        FakeProvider {
            fail: true,
            ..FakeProvider::default()
        },
        BackendMode::Reply { abusive: false },
    );
    let err = h.orchestrator.initiate_call(request()).await.unwrap_err();
    assert!(err.to_string().starts_with("Failed to initiate call"));
    assert!(h.store.is_empty());
    assert!(h.logs.is_empty());
}

#[tokio::test]
async fn test_connect_greets_with_persona() {
    let h = harness(BackendMode::Reply { abusive: false });
    h.orchestrator.initiate_call(request()).await.unwrap();

    let reply = h.engine.on_connect("CA1", None).await;
    assert_eq!(reply.persona, PersonaId::Ekta);
    match reply.decision {
        Decision::Greet { text } => {
            assert!(text.starts_with("Good day! I am Ekta calling on behalf of Acme Telecom."));
            assert!(text.contains("Your broadband plan renews next week."));
        },
        other => panic!("unexpected decision: {other:?}"),
    }
}

#[tokio::test]
async fn test_connect_reseeds_lost_session_from_payload() {
    let placing = harness(BackendMode::Reply { abusive: false });
    placing.orchestrator.initiate_call(request()).await.unwrap();
    let url = placing.provider.placed.lock()[0].webhook_url.clone();
    let payload = payload_from(&url);

    // A fresh instance that never saw the placement
    let answering = harness(BackendMode::Reply { abusive: false });
    assert!(answering.store.get("CA1").await.unwrap().is_none());

    let reply = answering.engine.on_connect("CA1", Some(&payload)).await;
    assert_eq!(reply.persona, PersonaId::Ekta);
    assert_eq!(
        reply.decision,
        Decision::Greet {
            text: "Good day! I am Ekta calling on behalf of Acme Telecom. Your broadband plan \
                   renews next week. I would be pleased to discuss this opportunity with you in detail."
                .to_string()
        }
    );

    let session = answering.store.get("CA1").await.unwrap().unwrap();
    assert_eq!(session.seed, decode_seed(&payload).unwrap());
    assert_eq!(session.seed.receiver_name.as_deref(), Some("Asha"));

    // Later turns carry no payload and are served from the store
    let reply = answering.engine.on_turn("CA1", "What does the premium plan cost?").await;
    assert_eq!(reply.persona, PersonaId::Ekta);
    assert_eq!(
        reply.decision,
        Decision::Continue {
            reply: "You said: What does the premium plan cost?".to_string()
        }
    );
    let session = answering.store.get("CA1").await.unwrap().unwrap();
    assert_eq!(session.exchange_count, 1);
    assert_eq!(answering.backend.seen_counts.lock().clone(), vec![0]);
}

#[tokio::test]
async fn test_live_call_survives_store_beyond_soft_capacity() {
    let store = Arc::new(InMemorySessionStore::new(10, 2));
    let logs = Arc::new(InMemoryCallLogStore::new());
    let engine = ConversationEngine::new(
        store.clone(),
        Arc::new(FakeBackend::new(BackendMode::Reply { abusive: false })),
        logs,
        ConversationPolicy::default(),
        Duration::from_secs(8),
    );

    let seed = harness(BackendMode::Reply { abusive: false })
        .orchestrator
        .build_seed(&request());
    for call_id in ["live1", "live2", "live3", "live4"] {
        store.create(call_id, seed.clone()).await.unwrap();
    }

    let reply = engine.on_turn("live1", "what is the price").await;
    assert_eq!(
        reply.decision,
        Decision::Continue {
            reply: "You said: what is the price".to_string()
        }
    );
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_connect_without_session_or_payload_is_generic() {
    let h = harness(BackendMode::Reply { abusive: false });
    for payload in [None, Some("not-a-payload!!")] {
        let reply = h.engine.on_connect("CA404", payload).await;
        assert_eq!(reply.persona, PersonaId::default());
        assert_eq!(
            reply.decision,
            Decision::Greet {
                text: lines::GENERIC_GREETING.to_string()
            }
        );
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_turn_appends_exchange_and_continues() {
    let h = harness(BackendMode::Reply { abusive: false });
    h.orchestrator.initiate_call(request()).await.unwrap();

    let reply = h.engine.on_turn("CA1", "What does the premium plan cost?").await;
    assert_eq!(
        reply.decision,
        Decision::Continue {
            reply: "You said: What does the premium plan cost?".to_string()
        }
    );

    let session = h.store.get("CA1").await.unwrap().unwrap();
    assert_eq!(session.exchange_count, 1);
    assert_eq!(session.conversation_history[0].user_utterance, "What does the premium plan cost?");
}

#[tokio::test]
async fn test_fifth_exchange_offers_escalation() {
    let h = harness(BackendMode::Reply { abusive: false });
    h.orchestrator.initiate_call(request()).await.unwrap();

    for turn in 1..=4 {
        let reply = h.engine.on_turn("CA1", &format!("question {turn}")).await;
        assert_eq!(reply.decision.kind(), "continue", "turn {turn}");
    }
    let reply = h.engine.on_turn("CA1", "question 5").await;
    assert_eq!(
        reply.decision,
        Decision::OfferEscalation {
            reply: "You said: question 5".to_string()
        }
    );
    assert_eq!(*h.backend.seen_counts.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_escalation_with_number_transfers() {
    let h = harness(BackendMode::Reply { abusive: false });
    let mut req = request();
    req.escalation_number = Some("9876500000".to_string());
    h.orchestrator.initiate_call(req).await.unwrap();

    // Keywords win regardless of exchange count
    h.engine.on_turn("CA1", "first question").await;
    let reply = h.engine.on_turn("CA1", "Can I talk to someone?").await;
    assert_eq!(
        reply.decision,
        Decision::Escalate {
            number: "+919876500000".to_string()
        }
    );
    assert_eq!(h.backend.seen_counts.lock().len(), 1);

    wait_for_log(&h.logs, "CA1", |r| {
        r.handled_by == HandledBy::Human && r.escalation_reason.as_deref() == Some(TRANSFER_REASON)
    })
    .await;
}

#[tokio::test]
async fn test_escalation_without_number_collects_callback() {
    let h = harness(BackendMode::Reply { abusive: false });
    h.orchestrator.initiate_call(request()).await.unwrap();

    let reply = h.engine.on_turn("CA1", "I want a HUMAN").await;
    assert_eq!(reply.decision, Decision::CollectCallback);
    assert!(h.backend.seen_counts.lock().is_empty());

    let reply = h.engine.on_callback("CA1", "Asha, 98765 43210").await;
    assert_eq!(reply.persona, PersonaId::Ekta);
    assert_eq!(reply.decision, Decision::terminate(lines::CALLBACK_CONFIRMED));

    wait_for_log(&h.logs, "CA1", |r| {
        r.callback_details.as_deref() == Some("Asha, 98765 43210")
            && r.escalation_reason.as_deref() == Some(CALLBACK_REASON)
            && r.handled_by == HandledBy::Human
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_backend_timeout_ends_call_with_persona_line() {
    let h = harness(BackendMode::Hang);
    h.orchestrator.initiate_call(request()).await.unwrap();

    let started = tokio::time::Instant::now();
    let reply = h.engine.on_turn("CA1", "Hello?").await;
    assert!(started.elapsed() <= Duration::from_secs(9));
    assert_eq!(reply.decision, Decision::terminate(PersonaId::Ekta.fallback_line()));

    let session = h.store.get("CA1").await.unwrap().unwrap();
    assert_eq!(session.exchange_count, 0);
}

#[tokio::test]
async fn test_backend_error_ends_call_with_persona_line() {
    let h = harness(BackendMode::Fail);
    let mut req = request();
    req.voice_settings = Some(VoiceSettings {
        personality: PersonaId::Tanmay,
        language: LanguageMode::English,
    });
    h.orchestrator.initiate_call(req).await.unwrap();

    let reply = h.engine.on_turn("CA1", "Hello?").await;
    assert_eq!(reply.persona, PersonaId::Tanmay);
    assert_eq!(reply.decision, Decision::terminate(PersonaId::Tanmay.fallback_line()));
}

#[tokio::test]
async fn test_abusive_reply_flags_call_log() {
    let h = harness(BackendMode::Reply { abusive: true });
    h.orchestrator.initiate_call(request()).await.unwrap();

    let reply = h.engine.on_turn("CA1", "something rude").await;
    assert_eq!(reply.decision.kind(), "continue");

    wait_for_log(&h.logs, "CA1", |r| r.abusive_detected).await;
}

#[tokio::test]
async fn test_turn_for_unknown_call_apologizes() {
    let h = harness(BackendMode::Reply { abusive: false });
    let reply = h.engine.on_turn("CA404", "hello").await;
    assert_eq!(reply.decision, Decision::terminate(lines::SESSION_MISSING_APOLOGY));
    assert!(h.backend.seen_counts.lock().is_empty());
}

#[tokio::test]
async fn test_silence_says_goodbye() {
    let h = harness(BackendMode::Reply { abusive: false });
    h.orchestrator.initiate_call(request()).await.unwrap();
    let reply = h.engine.on_turn("CA1", "   ").await;
    assert_eq!(reply.decision, Decision::terminate(lines::FOLLOWUP_GOODBYE));
}

#[tokio::test]
async fn test_full_call_lifecycle() {
    let h = harness(BackendMode::Reply { abusive: false });
    h.orchestrator.initiate_call(request()).await.unwrap();
    h.engine.on_connect("CA1", None).await;
    h.engine.on_turn("CA1", "Tell me about the premium plan").await;

    let outcome = h
        .reconciler
        .on_status_update("CA1", &CallStatus::Completed, Some(95))
        .await;
    assert_eq!(outcome, StatusOutcome::Finalized { session_removed: true });
    assert!(h.store.is_empty());

    let record = h.logs.get("CA1").await.unwrap().unwrap();
    assert_eq!(record.status, "completed");
    assert_eq!(record.duration_secs, Some(95));
    assert_eq!(
        record.transcript.as_deref(),
        Some("Asha: Tell me about the premium plan\nEkta: You said: Tell me about the premium plan")
    );
}
