//! TwiML response builder
//!
//! A response is an ordered list of verbs rendered into the provider's XML
//! vocabulary. Text and attribute values are escaped by the writer, so any
//! AI-generated reply renders into a well-formed document.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use voice_call_core::VoiceProfile;

use crate::TransportError;

/// Static document served when rendering itself fails
pub const FALLBACK_TWIML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<Response><Say>Thank you for your time. We are experiencing technical difficulties. Goodbye!</Say><Hangup/></Response>";

/// Speak text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Say {
    pub text: String,
    pub voice: Option<VoiceProfile>,
}

/// Listen for speech and post the transcript to `action`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gather {
    pub action: String,
    pub timeout_secs: u32,
    pub speech_timeout_secs: Option<u32>,
    /// Spoken while listening
    pub prompts: Vec<Say>,
}

/// Bridge the caller to another number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dial {
    pub number: String,
    pub timeout_secs: u32,
    pub caller_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verb {
    Say(Say),
    Gather(Gather),
    Dial(Dial),
    Hangup,
}

/// Ordered TwiML document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TwimlResponse {
    verbs: Vec<Verb>,
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

impl TwimlResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>, voice: Option<VoiceProfile>) -> Self {
        self.verbs.push(Verb::Say(Say {
            text: text.into(),
            voice,
        }));
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn dial(mut self, dial: Dial) -> Self {
        self.verbs.push(Verb::Dial(dial));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Every spoken line in document order, including gather prompts
    pub fn spoken_lines(&self) -> Vec<&str> {
        let mut lines = Vec::new();
        for verb in &self.verbs {
            match verb {
                Verb::Say(say) => lines.push(say.text.as_str()),
                Verb::Gather(gather) => {
                    lines.extend(gather.prompts.iter().map(|p| p.text.as_str()))
                },
                _ => {},
            }
        }
        lines
    }

    /// Whether a hangup is preceded by at least one non-empty spoken line
    pub fn speaks_before_hangup(&self) -> bool {
        let mut spoken = false;
        for verb in &self.verbs {
            match verb {
                Verb::Say(say) if !say.text.trim().is_empty() => spoken = true,
                Verb::Hangup => return spoken,
                _ => {},
            }
        }
        true
    }

    /// Render the XML document
    pub fn render(&self) -> Result<String, TransportError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(&mut writer, Event::Start(BytesStart::new("Response")))?;
        for verb in &self.verbs {
            write_verb(&mut writer, verb)?;
        }
        write(&mut writer, Event::End(BytesEnd::new("Response")))?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| TransportError::Markup(e.to_string()))
    }

    /// Render, falling back to [`FALLBACK_TWIML`]
    pub fn render_or_fallback(&self) -> String {
        match self.render() {
            Ok(xml) => xml,
            Err(e) => {
                tracing::error!(error = %e, "TwiML rendering failed, serving fallback");
                FALLBACK_TWIML.to_string()
            },
        }
    }
}

fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), TransportError> {
    writer
        .write_event(event)
        .map_err(|e| TransportError::Markup(e.to_string()))
}

fn write_say(writer: &mut XmlWriter, say: &Say) -> Result<(), TransportError> {
    let mut start = BytesStart::new("Say");
    if let Some(voice) = &say.voice {
        start.push_attribute(("voice", voice.voice.as_str()));
        start.push_attribute(("language", voice.locale));
    }
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(&say.text)))?;
    write(writer, Event::End(BytesEnd::new("Say")))
}

fn write_verb(writer: &mut XmlWriter, verb: &Verb) -> Result<(), TransportError> {
    match verb {
        Verb::Say(say) => write_say(writer, say),
        Verb::Gather(gather) => {
            let timeout = gather.timeout_secs.to_string();
            let mut start = BytesStart::new("Gather");
            start.push_attribute(("input", "speech"));
            start.push_attribute(("timeout", timeout.as_str()));
            let speech_timeout = gather.speech_timeout_secs.map(|s| s.to_string());
            if let Some(speech_timeout) = &speech_timeout {
                start.push_attribute(("speechTimeout", speech_timeout.as_str()));
            }
            start.push_attribute(("action", gather.action.as_str()));
            start.push_attribute(("method", "POST"));

            write(writer, Event::Start(start))?;
            for prompt in &gather.prompts {
                write_say(writer, prompt)?;
            }
            write(writer, Event::End(BytesEnd::new("Gather")))
        },
        Verb::Dial(dial) => {
            let timeout = dial.timeout_secs.to_string();
            let mut start = BytesStart::new("Dial");
            start.push_attribute(("timeout", timeout.as_str()));
            if let Some(caller_id) = &dial.caller_id {
                start.push_attribute(("callerId", caller_id.as_str()));
            }
            write(writer, Event::Start(start))?;
            write(writer, Event::Start(BytesStart::new("Number")))?;
            write(writer, Event::Text(BytesText::new(&dial.number)))?;
            write(writer, Event::End(BytesEnd::new("Number")))?;
            write(writer, Event::End(BytesEnd::new("Dial")))
        },
        Verb::Hangup => write(writer, Event::Empty(BytesStart::new("Hangup"))),
    }
}
