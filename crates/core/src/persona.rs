//! Personas: named synthetic voices with their own greeting style
//!
//! Each persona has a fixed introductory template, a voice/locale pair used
//! when rendering speech, and a canned closing line spoken when the AI
//! backend cannot be reached.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::language::LanguageMode;

/// Identifier of a voice persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersonaId {
    /// Male, professional
    #[default]
    Priyanshu,
    /// Male, energetic
    Tanmay,
    /// Female, formal
    Ekta,
    /// Female, technical
    Priyanka,
}

/// Voice gender as understood by the telephony provider's basic voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Man,
    Woman,
}

impl VoiceGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Man => "man",
            Self::Woman => "woman",
        }
    }
}

/// Voice and locale used for every spoken line of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceProfile {
    pub voice: VoiceGender,
    pub locale: &'static str,
}

impl PersonaId {
    pub const ALL: [PersonaId; 4] = [
        PersonaId::Priyanshu,
        PersonaId::Tanmay,
        PersonaId::Ekta,
        PersonaId::Priyanka,
    ];

    /// Resolve a persona label; unknown or empty labels fall back to the default persona
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "priyanshu" => Self::Priyanshu,
            "tanmay" => Self::Tanmay,
            "ekta" => Self::Ekta,
            "priyanka" => Self::Priyanka,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Priyanshu => "priyanshu",
            Self::Tanmay => "tanmay",
            Self::Ekta => "ekta",
            Self::Priyanka => "priyanka",
        }
    }

    /// Name the persona introduces itself with (also the call log's bot name)
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Priyanshu => "Priyanshu",
            Self::Tanmay => "Tanmay",
            Self::Ekta => "Ekta",
            Self::Priyanka => "Priyanka",
        }
    }

    pub fn voice(&self) -> VoiceProfile {
        let voice = match self {
            Self::Priyanshu | Self::Tanmay => VoiceGender::Man,
            Self::Ekta | Self::Priyanka => VoiceGender::Woman,
        };
        VoiceProfile {
            voice,
            locale: "en-IN",
        }
    }

    /// Opening line spoken when the callee answers
    pub fn greeting(&self, company_name: &str, call_information: &str) -> String {
        match self {
            Self::Priyanshu => format!(
                "Hello! I'm Priyanshu calling on behalf of {company_name}. {call_information} \
                 I wanted to reach out to discuss this with you and see how we can assist you further."
            ),
            Self::Tanmay => format!(
                "Hey there! I'm Tanmay from {company_name}! {call_information} \
                 This is super exciting and I'd love to chat with you about it!"
            ),
            Self::Ekta => format!(
                "Good day! I am Ekta calling on behalf of {company_name}. {call_information} \
                 I would be pleased to discuss this opportunity with you in detail."
            ),
            Self::Priyanka => format!(
                "Hello! I'm Priyanka from {company_name}. {call_information} \
                 From a technical perspective, I'd like to discuss how this can benefit your infrastructure."
            ),
        }
    }

    /// Closing line spoken when the AI backend fails mid-call
    pub fn fallback_line(&self) -> &'static str {
        match self {
            Self::Priyanshu => {
                "Thank you for your response. Our team will follow up with you shortly \
                 with all the details. Have a great day!"
            },
            Self::Tanmay => {
                "That's awesome, thanks! Our team will get back to you super soon with \
                 everything you need. Take care!"
            },
            Self::Ekta => {
                "Thank you for your inquiry. A member of our team will contact you \
                 shortly with further information. Good day!"
            },
            Self::Priyanka => {
                "Thanks for that. Our solutions team will reach out shortly with the \
                 technical details. Have a great day!"
            },
        }
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown or null labels resolve to the default persona
impl<'de> Deserialize<'de> for PersonaId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(PersonaId::from_label).unwrap_or_default())
    }
}

/// Voice settings supplied with a make-call request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default)]
    pub personality: PersonaId,
    #[serde(default)]
    pub language: LanguageMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_persona_falls_back_to_default() {
        assert_eq!(PersonaId::from_label("nobody"), PersonaId::Priyanshu);
        assert_eq!(PersonaId::from_label(""), PersonaId::Priyanshu);
        assert_eq!(PersonaId::from_label(" EKTA "), PersonaId::Ekta);
    }

    #[test]
    fn test_voice_mapping() {
        assert_eq!(PersonaId::Tanmay.voice().voice, VoiceGender::Man);
        assert_eq!(PersonaId::Priyanka.voice().voice, VoiceGender::Woman);
        for persona in PersonaId::ALL {
            assert_eq!(persona.voice().locale, "en-IN");
        }
    }

    #[test]
    fn test_greeting_interpolation() {
        let greeting = PersonaId::Ekta.greeting("Acme Corp", "Your order has shipped.");
        assert!(greeting.starts_with("Good day! I am Ekta"));
        assert!(greeting.contains("Acme Corp"));
        assert!(greeting.contains("Your order has shipped."));
    }

    #[test]
    fn test_priyanka_greeting_wording() {
        assert_eq!(
            PersonaId::Priyanka.greeting("Acme Cloud", "Your cluster is ready."),
            "Hello! I'm Priyanka from Acme Cloud. Your cluster is ready. From a technical \
             perspective, I'd like to discuss how this can benefit your infrastructure."
        );
    }

    #[test]
    fn test_fallback_lines_are_distinct() {
        let lines: std::collections::HashSet<_> =
            PersonaId::ALL.iter().map(|p| p.fallback_line()).collect();
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_lenient_deserialization() {
        let settings: VoiceSettings =
            serde_json::from_str(r#"{"personality":"robot","language":"hindi"}"#).unwrap();
        assert_eq!(settings.personality, PersonaId::Priyanshu);
        assert_eq!(settings.language, LanguageMode::Hindi);

        let settings: VoiceSettings = serde_json::from_str(r#"{"personality":null}"#).unwrap();
        assert_eq!(settings.personality, PersonaId::Priyanshu);
    }
}
