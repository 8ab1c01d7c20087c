//! Conversation policy
//!
//! Pure decisions about what the call does next. Rendering a decision into
//! markup is the server's job; nothing here performs I/O.

use voice_call_config::{constants::lines, ConversationConfig, Settings};
use voice_call_core::{normalize_phone_number, PersonaId, SessionSeed};

/// What the call does after a webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Speak the opening line and listen
    Greet { text: String },
    /// Speak the AI reply and listen for a follow-up
    Continue { reply: String },
    /// Speak the AI reply and offer a human transfer
    OfferEscalation { reply: String },
    /// Bridge the caller to a human
    Escalate { number: String },
    /// No human available; take callback details
    CollectCallback,
    /// Speak a closing line and hang up
    Terminate { line: String },
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::Greet { .. } => "greet",
            Decision::Continue { .. } => "continue",
            Decision::OfferEscalation { .. } => "offer_escalation",
            Decision::Escalate { .. } => "escalate",
            Decision::CollectCallback => "collect_callback",
            Decision::Terminate { .. } => "terminate",
        }
    }

    pub fn terminate(line: impl Into<String>) -> Self {
        Decision::Terminate { line: line.into() }
    }
}

/// Plan for a caller turn, before any I/O
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPlan {
    /// The turn is settled without the AI backend
    Decided(Decision),
    /// Ask the AI backend, then settle with [`ConversationPolicy::after_reply`]
    /// or [`ConversationPolicy::on_backend_failure`]
    ConsultBackend,
}

#[derive(Debug, Clone)]
pub struct ConversationPolicy {
    keywords: Vec<String>,
    offer_threshold: u32,
    country_code: String,
}

impl ConversationPolicy {
    pub fn new(keywords: &[String], offer_threshold: u32, country_code: impl Into<String>) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            offer_threshold: offer_threshold.max(1),
            country_code: country_code.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_config(&settings.conversation, &settings.telephony.default_country_code)
    }

    pub fn from_config(config: &ConversationConfig, country_code: &str) -> Self {
        Self::new(
            &config.escalation_keywords,
            config.escalation_offer_threshold,
            country_code,
        )
    }

    /// Whether the caller asked for a human (case-insensitive substring match)
    pub fn wants_human(&self, utterance: &str) -> bool {
        let lowered = utterance.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Decision order for a caller turn: silence, then a request for a
    /// human (regardless of exchange count), then AI continuation
    pub fn decide_turn(&self, utterance: &str, seed: &SessionSeed) -> TurnPlan {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            TurnPlan::Decided(self.on_silence())
        } else if self.wants_human(utterance) {
            TurnPlan::Decided(self.escalate(seed))
        } else {
            TurnPlan::ConsultBackend
        }
    }

    /// Opening decision for a connected call
    pub fn greet(&self, seed: Option<&SessionSeed>) -> Decision {
        match seed.filter(|s| s.has_call_information()) {
            Some(seed) => Decision::Greet {
                text: seed
                    .persona()
                    .greeting(&seed.company_name, seed.call_information.trim()),
            },
            None => Decision::Greet {
                text: lines::GENERIC_GREETING.to_string(),
            },
        }
    }

    /// Transfer when an escalation number exists, otherwise take a callback
    pub fn escalate(&self, seed: &SessionSeed) -> Decision {
        match seed.escalation_number() {
            Some(number) => Decision::Escalate {
                number: normalize_phone_number(number, &self.country_code),
            },
            None => Decision::CollectCallback,
        }
    }

    /// Decision after a successful AI reply; `exchange_count` includes it
    pub fn after_reply(&self, reply: String, exchange_count: u32) -> Decision {
        if exchange_count >= self.offer_threshold {
            Decision::OfferEscalation { reply }
        } else {
            Decision::Continue { reply }
        }
    }

    /// Closing decision when the AI backend cannot produce a reply
    pub fn on_backend_failure(&self, persona: PersonaId) -> Decision {
        Decision::terminate(persona.fallback_line())
    }

    /// Closing decision when the caller said nothing
    pub fn on_silence(&self) -> Decision {
        Decision::terminate(lines::FOLLOWUP_GOODBYE)
    }
}

impl Default for ConversationPolicy {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default(), "91")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> SessionSeed {
        SessionSeed {
            company_name: "Acme".to_string(),
            call_information: "Your plan renews next week.".to_string(),
            target_number: "+919876543210".to_string(),
            ..SessionSeed::default()
        }
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let policy = ConversationPolicy::default();
        assert!(policy.wants_human("Can I TALK TO SOMEONE please"));
        assert!(policy.wants_human("I want a human"));
        assert!(!policy.wants_human("What does the plan cost?"));
    }

    #[test]
    fn test_substring_match_includes_embedded_words() {
        // "agent" inside "agents"
        let policy = ConversationPolicy::default();
        assert!(policy.wants_human("are your agents available"));
    }

    #[test]
    fn test_custom_keywords() {
        let policy = ConversationPolicy::new(&["Supervisor".to_string(), " ".to_string()], 5, "91");
        assert!(policy.wants_human("get me a supervisor"));
        assert!(!policy.wants_human("connect me"));
    }

    #[test]
    fn test_escalate_normalizes_number() {
        let policy = ConversationPolicy::default();
        let mut seed = seed();
        seed.escalation_number = Some("9876500000".to_string());
        assert_eq!(
            policy.escalate(&seed),
            Decision::Escalate {
                number: "+919876500000".to_string()
            }
        );
    }

    #[test]
    fn test_escalate_without_number_collects_callback() {
        let policy = ConversationPolicy::default();
        let mut seed = seed();
        assert_eq!(policy.escalate(&seed), Decision::CollectCallback);
        seed.escalation_number = Some("   ".to_string());
        assert_eq!(policy.escalate(&seed), Decision::CollectCallback);
    }

    #[test]
    fn test_turn_decision_order() {
        let policy = ConversationPolicy::default();
        let mut seed = seed();

        assert_eq!(
            policy.decide_turn("   ", &seed),
            TurnPlan::Decided(Decision::terminate(lines::FOLLOWUP_GOODBYE))
        );
        assert_eq!(
            policy.decide_turn("what does it cost", &seed),
            TurnPlan::ConsultBackend
        );
        assert_eq!(
            policy.decide_turn("let me talk to someone", &seed),
            TurnPlan::Decided(Decision::CollectCallback)
        );

        seed.escalation_number = Some("+919876500000".to_string());
        assert_eq!(
            policy.decide_turn("Transfer me now", &seed),
            TurnPlan::Decided(Decision::Escalate {
                number: "+919876500000".to_string()
            })
        );
    }

    #[test]
    fn test_offer_from_threshold() {
        let policy = ConversationPolicy::default();
        assert_eq!(policy.after_reply("r".to_string(), 4).kind(), "continue");
        assert_eq!(policy.after_reply("r".to_string(), 5).kind(), "offer_escalation");
        assert_eq!(policy.after_reply("r".to_string(), 9).kind(), "offer_escalation");
    }

    #[test]
    fn test_greeting_uses_persona_or_generic() {
        let policy = ConversationPolicy::default();
        let mut seed = seed();
        seed.voice_settings.personality = PersonaId::Tanmay;
        match policy.greet(Some(&seed)) {
            Decision::Greet { text } => {
                assert!(text.starts_with("Hey there! I'm Tanmay from Acme!"));
                assert!(text.contains("Your plan renews next week."));
            },
            other => panic!("unexpected decision: {other:?}"),
        }

        seed.call_information = "  ".to_string();
        assert_eq!(
            policy.greet(Some(&seed)),
            Decision::Greet {
                text: lines::GENERIC_GREETING.to_string()
            }
        );
        assert_eq!(policy.greet(None).kind(), "greet");
    }

    #[test]
    fn test_backend_failure_uses_persona_line() {
        let policy = ConversationPolicy::default();
        assert_eq!(
            policy.on_backend_failure(PersonaId::Ekta),
            Decision::terminate(PersonaId::Ekta.fallback_line())
        );
    }
}
