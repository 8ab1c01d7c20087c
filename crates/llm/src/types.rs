//! Wire types of the AI backend's voice-response endpoint

use serde::{Deserialize, Serialize};
use voice_call_core::{CallSession, Exchange, KnowledgeChunk, Language, LanguageMode, PersonaId, VoiceSettings};

/// Session context sent with every turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallContext<'a> {
    pub call_sid: &'a str,
    pub company_name: &'a str,
    pub information: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<&'a str>,
    pub personality: PersonaId,
    pub language: LanguageMode,
    pub conversation_history: &'a [Exchange],
    pub exchange_count: u32,
}

/// Request body for one caller turn
#[derive(Debug, Clone, Serialize)]
pub struct AiTurnRequest<'a> {
    pub user_message: &'a str,
    pub call_data: CallContext<'a>,
    pub voice_settings: VoiceSettings,
    pub call_sid: &'a str,
    pub knowledge_base: &'a [KnowledgeChunk],
}

impl<'a> AiTurnRequest<'a> {
    pub fn from_session(session: &'a CallSession, user_message: &'a str) -> Self {
        let seed = &session.seed;
        Self {
            user_message,
            call_data: CallContext {
                call_sid: &session.call_id,
                company_name: &seed.company_name,
                information: &seed.call_information,
                receiver_name: seed.receiver_name.as_deref(),
                personality: seed.persona(),
                language: seed.language_mode(),
                conversation_history: &session.conversation_history,
                exchange_count: session.exchange_count,
            },
            voice_settings: seed.voice_settings,
            call_sid: &session.call_id,
            knowledge_base: &seed.knowledge_chunks,
        }
    }
}

/// Backend reply; only `ai_response` is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiReply {
    pub ai_response: String,
    #[serde(default)]
    pub detected_language: Option<String>,
    #[serde(default)]
    pub language_confidence: Option<f32>,
    #[serde(default, alias = "abusive")]
    pub abusive_detected: bool,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl AiReply {
    /// Language reported by the backend, if it is one we track
    pub fn language(&self) -> Option<Language> {
        self.detected_language.as_deref().and_then(Language::from_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_call_core::SessionSeed;

    #[test]
    fn test_request_shape() {
        let mut seed = SessionSeed {
            company_name: "Acme".to_string(),
            call_information: "Renewal reminder".to_string(),
            ..SessionSeed::default()
        };
        seed.knowledge_chunks.push(KnowledgeChunk {
            title: "Plans".to_string(),
            content: "Gold plan".to_string(),
            category: String::new(),
            chunk_index: 1,
        });
        let session = CallSession::new("CA9", seed);

        let value = serde_json::to_value(AiTurnRequest::from_session(&session, "how much?")).unwrap();
        assert_eq!(value["user_message"], "how much?");
        assert_eq!(value["call_sid"], "CA9");
        assert_eq!(value["call_data"]["companyName"], "Acme");
        assert_eq!(value["call_data"]["information"], "Renewal reminder");
        assert_eq!(value["voice_settings"]["personality"], "priyanshu");
        assert_eq!(value["knowledge_base"][0]["chunkIndex"], 1);
    }

    #[test]
    fn test_reply_defaults() {
        let reply: AiReply = serde_json::from_str(r#"{"ai_response":"Sure!"}"#).unwrap();
        assert_eq!(reply.ai_response, "Sure!");
        assert!(!reply.abusive_detected);
        assert_eq!(reply.language(), None);

        let reply: AiReply = serde_json::from_str(
            r#"{"ai_response":"Haan ji","detected_language":"hindi","abusive":true,"sentiment":{"label":"neutral"}}"#,
        )
        .unwrap();
        assert!(reply.abusive_detected);
        assert_eq!(reply.language(), Some(Language::Hindi));
    }
}
