//! Call session state
//!
//! A [`SessionSeed`] is what the orchestrator knows when a call is placed; it
//! is also the shape carried in the fallback webhook payload. A
//! [`CallSession`] wraps the seed with the conversation accumulated over the
//! webhook round-trips of one call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeChunk;
use crate::language::{Language, LanguageMode};
use crate::persona::{PersonaId, VoiceSettings};

fn default_company_name() -> String {
    "Your Company".to_string()
}

/// Initial data for a call session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSeed {
    #[serde(default)]
    pub company_id: String,
    #[serde(default = "default_company_name")]
    pub company_name: String,
    /// What the call is about; spoken as part of the greeting
    #[serde(default, alias = "information")]
    pub call_information: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub target_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_number: Option<String>,
    #[serde(default)]
    pub voice_settings: VoiceSettings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge_chunks: Vec<KnowledgeChunk>,
}

impl SessionSeed {
    pub fn persona(&self) -> PersonaId {
        self.voice_settings.personality
    }

    pub fn language_mode(&self) -> LanguageMode {
        self.voice_settings.language
    }

    /// Escalation number if one was configured and is not blank
    pub fn escalation_number(&self) -> Option<&str> {
        self.escalation_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Whether there is enough context for a persona greeting
    pub fn has_call_information(&self) -> bool {
        !self.call_information.trim().is_empty()
    }
}

impl Default for SessionSeed {
    fn default() -> Self {
        Self {
            company_id: String::new(),
            company_name: default_company_name(),
            call_information: String::new(),
            receiver_name: None,
            target_number: String::new(),
            escalation_number: None,
            voice_settings: VoiceSettings::default(),
            knowledge_chunks: Vec::new(),
        }
    }
}

/// One caller utterance and the reply spoken back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub user_utterance: String,
    pub ai_utterance: String,
    pub language: Language,
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn new(user_utterance: impl Into<String>, ai_utterance: impl Into<String>, language: Language) -> Self {
        Self {
            user_utterance: user_utterance.into(),
            ai_utterance: ai_utterance.into(),
            language,
            timestamp: Utc::now(),
        }
    }
}

/// Conversational state for one outbound call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub call_id: String,
    #[serde(flatten)]
    pub seed: SessionSeed,
    /// Most recent exchanges, oldest first
    pub conversation_history: Vec<Exchange>,
    /// Completed AI turns; never reduced when history is truncated
    pub exchange_count: u32,
    pub created_at: DateTime<Utc>,
}

impl CallSession {
    pub fn new(call_id: impl Into<String>, seed: SessionSeed) -> Self {
        Self {
            call_id: call_id.into(),
            seed,
            conversation_history: Vec::new(),
            exchange_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Append an exchange, keeping at most `history_limit` entries
    pub fn push_exchange(&mut self, exchange: Exchange, history_limit: usize) {
        self.conversation_history.push(exchange);
        let excess = self
            .conversation_history
            .len()
            .saturating_sub(history_limit.max(1));
        if excess > 0 {
            self.conversation_history.drain(..excess);
        }
        self.exchange_count = self.exchange_count.saturating_add(1);
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds().max(0)
    }

    /// Render the retained history as a speaker-labelled transcript
    pub fn transcript(&self) -> String {
        let caller = self
            .seed
            .receiver_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Customer");
        let bot = self.seed.persona().display_name();

        self.conversation_history
            .iter()
            .map(|e| format!("{caller}: {}\n{bot}: {}", e.user_utterance, e.ai_utterance))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            call_id: self.call_id.clone(),
            exchange_count: self.exchange_count,
            age_secs: self.age_secs(now),
            knowledge_chunks: self.seed.knowledge_chunks.len(),
        }
    }
}

/// Diagnostic view of a single session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub call_id: String,
    pub exchange_count: u32,
    pub age_secs: i64,
    pub knowledge_chunks: usize,
}

/// Snapshot returned by the session store's `stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub active_count: usize,
    pub sessions: Vec<SessionSummary>,
}
