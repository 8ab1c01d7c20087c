//! Language modes and detection
//!
//! Callers may speak English, Hindi, or romanized Hindi mixed with English.
//! The AI backend usually reports the language it detected; when it does not,
//! exchanges are tagged with the lightweight heuristic below.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Language preference configured for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMode {
    #[default]
    Auto,
    English,
    Hindi,
}

impl LanguageMode {
    /// Accepts mode names as well as the locale codes used by older clients
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "english" | "en" | "en-in" | "en-us" => Self::English,
            "hindi" | "hi" | "hi-in" => Self::Hindi,
            _ => Self::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::English => "english",
            Self::Hindi => "hindi",
        }
    }
}

impl<'de> Deserialize<'de> for LanguageMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(LanguageMode::from_label).unwrap_or_default())
    }
}

/// Language an exchange was conducted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    /// Map the backend's free-form language label, if it names one we track
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "english" | "en" | "en-in" => Some(Self::English),
            "hindi" | "hi" | "hi-in" | "hinglish" => Some(Self::Hindi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Hindi => "hindi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common romanized Hindi words
const HINDI_MARKERS: &[&str] = &[
    "hai", "kya", "mein", "aap", "hum", "baare", "ke", "se", "main", "acha", "accha", "nahi",
    "haan",
];

/// Minimum number of distinct marker words for an utterance to count as Hindi
const HINDI_MARKER_THRESHOLD: usize = 2;

/// Detect the language of a caller utterance.
///
/// Fixed modes win; in `Auto` mode an utterance is Hindi when it contains at
/// least two distinct marker words (whole-word, case-insensitive).
pub fn detect_language(utterance: &str, mode: LanguageMode) -> Language {
    match mode {
        LanguageMode::English => Language::English,
        LanguageMode::Hindi => Language::Hindi,
        LanguageMode::Auto => {
            let lowered = utterance.to_lowercase();
            let words: Vec<&str> = lowered
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect();
            let hits = HINDI_MARKERS
                .iter()
                .filter(|marker| words.contains(marker))
                .count();
            if hits >= HINDI_MARKER_THRESHOLD {
                Language::Hindi
            } else {
                Language::English
            }
        },
    }
}
