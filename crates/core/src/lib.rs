//! Core types for the voice call orchestrator
//!
//! This crate provides foundational types used across all other crates:
//! - Call session state (seed payload, exchanges, summaries)
//! - Personas and their voice/locale mapping
//! - Language modes and the romanized-Hindi detection heuristic
//! - Phone number normalization
//! - Knowledge article chunking
//! - Call status values reported by the telephony provider
//! - Error types

pub mod call_status;
pub mod error;
pub mod knowledge;
pub mod language;
pub mod persona;
pub mod phone;
pub mod session;

pub use call_status::CallStatus;
pub use error::{Error, Result};
pub use knowledge::{chunk_article, chunk_articles, KnowledgeArticle, KnowledgeChunk};
pub use language::{detect_language, Language, LanguageMode};
pub use persona::{PersonaId, VoiceGender, VoiceProfile, VoiceSettings};
pub use phone::{mask_phone_number, normalize_phone_number};
pub use session::{CallSession, Exchange, SessionSeed, SessionSummary, StoreStats};
