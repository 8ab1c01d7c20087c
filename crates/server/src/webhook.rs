//! Telephony webhooks
//!
//! Every handler answers with well-formed TwiML, whatever happened upstream.
//! Malformed deliveries are treated as empty payloads and routed to the
//! engine's degradation paths instead of being rejected.

use std::time::Instant;

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Form, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use voice_call_agent::{Decision, Reply};
use voice_call_config::{
    constants::{lines, paths},
    GatherTiming, Settings,
};
use voice_call_core::mask_phone_number;
use voice_call_transport::{
    ConnectWebhook, Dial, FallbackQuery, Gather, Say, StatusWebhook, TurnWebhook, TwimlResponse,
};

use crate::metrics::record_webhook;
use crate::state::AppState;

/// Render a decision into the provider's markup
pub fn render_reply(reply: &Reply, config: &Settings) -> TwimlResponse {
    let voice = Some(reply.persona.voice());
    let conversation = &config.conversation;
    let listen = |action: &str, timing: &GatherTiming, prompt: &str| Gather {
        action: action.to_string(),
        timeout_secs: timing.timeout_secs,
        speech_timeout_secs: timing.speech_timeout_secs,
        prompts: vec![Say {
            text: prompt.to_string(),
            voice,
        }],
    };

    match &reply.decision {
        Decision::Greet { text } => TwimlResponse::new()
            .say(text.as_str(), voice)
            .gather(listen(
                paths::HANDLE_RESPONSE,
                &conversation.greeting_gather,
                lines::GREETING_PROMPT,
            ))
            .say(lines::NO_RESPONSE_GOODBYE, voice)
            .hangup(),
        Decision::Continue { reply } => TwimlResponse::new()
            .say(reply.as_str(), voice)
            .gather(listen(
                paths::HANDLE_RESPONSE,
                &conversation.followup_gather,
                lines::FOLLOWUP_PROMPT,
            ))
            .say(lines::FOLLOWUP_GOODBYE, voice)
            .hangup(),
        Decision::OfferEscalation { reply } => TwimlResponse::new()
            .say(reply.as_str(), voice)
            .gather(listen(
                paths::HANDLE_RESPONSE,
                &conversation.followup_gather,
                lines::ESCALATION_OFFER_PROMPT,
            ))
            .say(lines::FOLLOWUP_GOODBYE, voice)
            .hangup(),
        Decision::Escalate { number } => TwimlResponse::new()
            .say(lines::TRANSFER_CONFIRMATION, voice)
            .dial(Dial {
                number: number.clone(),
                timeout_secs: config.telephony.bridge_timeout_secs,
                caller_id: Some(config.telephony.from_number.trim())
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            })
            .say(lines::TRANSFER_FAILED, voice)
            .hangup(),
        Decision::CollectCallback => TwimlResponse::new()
            .say(lines::CALLBACK_ACKNOWLEDGEMENT, voice)
            .gather(listen(
                paths::COLLECT_CALLBACK,
                &conversation.callback_gather,
                lines::CALLBACK_PROMPT,
            ))
            .say(lines::CALLBACK_GOODBYE, voice)
            .hangup(),
        Decision::Terminate { line } => {
            let line = if line.trim().is_empty() {
                lines::TECHNICAL_DIFFICULTIES
            } else {
                line.as_str()
            };
            TwimlResponse::new().say(line, voice).hangup()
        },
    }
}

fn twiml(response: &TwimlResponse) -> Response {
    (
        [(header::CONTENT_TYPE, "text/xml")],
        response.render_or_fallback(),
    )
        .into_response()
}

fn form_or_default<T: Default>(form: Result<Form<T>, FormRejection>, kind: &str) -> T {
    match form {
        Ok(Form(payload)) => payload,
        Err(e) => {
            tracing::warn!(webhook = kind, error = %e, "Malformed webhook body, treating as empty");
            T::default()
        },
    }
}

/// POST /api/voice/handle-call
pub async fn handle_call(
    State(state): State<AppState>,
    query: Result<Query<FallbackQuery>, QueryRejection>,
    form: Result<Form<ConnectWebhook>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let webhook = form_or_default(form, "connect");
    let payload = query.ok().and_then(|Query(q)| q.data);

    tracing::info!(
        call_id = %webhook.call_sid,
        from = %mask_phone_number(&webhook.from),
        to = %mask_phone_number(&webhook.to),
        has_payload = payload.is_some(),
        "Call connected"
    );

    let reply = state
        .engine
        .on_connect(&webhook.call_sid, payload.as_deref())
        .await;
    let response = twiml(&render_reply(&reply, &state.config));
    record_webhook("connect", started.elapsed());
    response
}

/// GET /api/voice/handle-call
pub async fn handle_call_liveness() -> &'static str {
    lines::WEBHOOK_LIVENESS
}

/// POST /api/voice/handle-response
pub async fn handle_response(
    State(state): State<AppState>,
    form: Result<Form<TurnWebhook>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let webhook = form_or_default(form, "turn");
    tracing::debug!(
        call_id = %webhook.call_sid,
        chars = webhook.utterance().chars().count(),
        "Caller turn"
    );

    let reply = state
        .engine
        .on_turn(&webhook.call_sid, webhook.utterance())
        .await;
    let response = twiml(&render_reply(&reply, &state.config));
    record_webhook("turn", started.elapsed());
    response
}

/// POST /api/voice/collect-callback
pub async fn collect_callback(
    State(state): State<AppState>,
    form: Result<Form<TurnWebhook>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let webhook = form_or_default(form, "callback");

    let reply = state
        .engine
        .on_callback(&webhook.call_sid, webhook.utterance())
        .await;
    let response = twiml(&render_reply(&reply, &state.config));
    record_webhook("callback", started.elapsed());
    response
}

/// POST /api/voice/handle-call/status
pub async fn status_callback(
    State(state): State<AppState>,
    form: Result<Form<StatusWebhook>, FormRejection>,
) -> StatusCode {
    let started = Instant::now();
    let webhook = form_or_default(form, "status");
    if webhook.call_sid.is_empty() {
        tracing::warn!(status = %webhook.call_status, "Status callback without call id");
    } else {
        state
            .reconciler
            .on_status_update(&webhook.call_sid, &webhook.status(), webhook.duration_secs())
            .await;
    }
    record_webhook("status", started.elapsed());
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_call_core::PersonaId;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.telephony.from_number = "+15550001111".to_string();
        settings
    }

    fn reply(decision: Decision) -> Reply {
        Reply {
            persona: PersonaId::Priyanka,
            decision,
        }
    }

    #[test]
    fn test_every_decision_speaks_before_hangup() {
        let decisions = vec![
            Decision::Greet {
                text: "Hello".to_string(),
            },
            Decision::Continue {
                reply: "Sure".to_string(),
            },
            Decision::OfferEscalation {
                reply: "Sure".to_string(),
            },
            Decision::Escalate {
                number: "+919876500000".to_string(),
            },
            Decision::CollectCallback,
            Decision::terminate("Bye"),
            Decision::terminate(""),
        ];
        for decision in decisions {
            let response = render_reply(&reply(decision.clone()), &settings());
            assert!(response.speaks_before_hangup(), "{decision:?}");
            assert!(response.render().is_ok());
        }
    }

    #[test]
    fn test_greeting_document() {
        let xml = render_reply(
            &reply(Decision::Greet {
                text: "Hello from Priyanka".to_string(),
            }),
            &settings(),
        )
        .render()
        .unwrap();
        assert!(xml.contains("<Say voice=\"woman\" language=\"en-IN\">Hello from Priyanka</Say>"));
        assert!(xml.contains(
            "<Gather input=\"speech\" timeout=\"5\" speechTimeout=\"3\" action=\"/api/voice/handle-response\" method=\"POST\">"
        ));
        assert!(xml.ends_with("<Hangup/></Response>"));
    }

    #[test]
    fn test_offer_uses_followup_timing_and_offer_prompt() {
        let response = render_reply(
            &reply(Decision::OfferEscalation {
                reply: "Premium is 999".to_string(),
            }),
            &settings(),
        );
        assert_eq!(
            response.spoken_lines(),
            vec![
                "Premium is 999",
                lines::ESCALATION_OFFER_PROMPT,
                lines::FOLLOWUP_GOODBYE
            ]
        );
        let xml = response.render().unwrap();
        assert!(xml.contains("timeout=\"4\" speechTimeout=\"2\""));
    }

    #[test]
    fn test_transfer_dials_with_caller_id() {
        let xml = render_reply(
            &reply(Decision::Escalate {
                number: "+919876500000".to_string(),
            }),
            &settings(),
        )
        .render()
        .unwrap();
        assert!(xml.contains(
            "<Dial timeout=\"30\" callerId=\"+15550001111\"><Number>+919876500000</Number></Dial>"
        ));
        assert!(xml.contains(lines::TRANSFER_FAILED));
    }

    #[test]
    fn test_callback_routes_to_collector() {
        let xml = render_reply(&reply(Decision::CollectCallback), &settings())
            .render()
            .unwrap();
        assert!(xml.contains("action=\"/api/voice/collect-callback\""));
        assert!(xml.contains("timeout=\"10\""));
        assert!(!xml.contains("speechTimeout"));
    }
}
