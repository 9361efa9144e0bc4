//! TwiML call-control markup.
//!
//! Only the verbs this server emits are modelled. Text and attribute values
//! are escaped by the XML writer.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fmt;

/// Content type Twilio expects for markup responses.
pub const TWIML_CONTENT_TYPE: &str = "text/xml";

/// Errors from rendering markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwimlError {
    /// The XML writer failed.
    Write { details: String },
    /// The output was not UTF-8.
    Encoding { details: String },
}

impl fmt::Display for TwimlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write { details } => write!(f, "failed to write TwiML: {details}"),
            Self::Encoding { details } => write!(f, "TwiML is not valid UTF-8: {details}"),
        }
    }
}

impl std::error::Error for TwimlError {}

/// Voice and language for `<Say>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SayVoice {
    pub voice: String,
    pub language: String,
}

/// Attributes of a speech `<Gather>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    /// Webhook that receives the recognized speech.
    pub action: String,
    /// Seconds of silence before giving up on input.
    pub timeout_seconds: u32,
}

impl Gather {
    #[must_use]
    pub fn speech(action: impl Into<String>, timeout_seconds: u32) -> Self {
        Self {
            action: action.into(),
            timeout_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verb {
    Say {
        text: String,
        voice: Option<SayVoice>,
    },
    Play {
        url: String,
    },
    Gather(Gather),
    Hangup,
}

/// A `<Response>` document under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Twiml {
    verbs: Vec<Verb>,
}

impl Twiml {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Speaks `text` with the carrier's default voice.
    #[must_use]
    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            voice: None,
        });
        self
    }

    /// Speaks `text` with an explicit voice and language.
    #[must_use]
    pub fn say_with(mut self, voice: &SayVoice, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            voice: Some(voice.clone()),
        });
        self
    }

    /// Plays audio from `url`.
    #[must_use]
    pub fn play(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Play { url: url.into() });
        self
    }

    /// Collects caller speech.
    #[must_use]
    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    /// Ends the call.
    #[must_use]
    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    /// Serializes the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn render(&self) -> Result<String, TwimlError> {
        let mut writer = Writer::new(Vec::new());

        write(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        write(&mut writer, Event::Start(BytesStart::new("Response")))?;

        for verb in &self.verbs {
            match verb {
                Verb::Say { text, voice } => {
                    let mut start = BytesStart::new("Say");
                    if let Some(voice) = voice {
                        start.push_attribute(("voice", voice.voice.as_str()));
                        start.push_attribute(("language", voice.language.as_str()));
                    }
                    write_text_element(&mut writer, start, "Say", text)?;
                }
                Verb::Play { url } => {
                    write_text_element(&mut writer, BytesStart::new("Play"), "Play", url)?;
                }
                Verb::Gather(gather) => {
                    let timeout = gather.timeout_seconds.to_string();
                    let mut start = BytesStart::new("Gather");
                    start.push_attribute(("input", "speech"));
                    start.push_attribute(("action", gather.action.as_str()));
                    start.push_attribute(("method", "POST"));
                    start.push_attribute(("timeout", timeout.as_str()));
                    start.push_attribute(("speechTimeout", "auto"));
                    start.push_attribute(("speechModel", "phone_call"));
                    write(&mut writer, Event::Empty(start))?;
                }
                Verb::Hangup => {
                    write(&mut writer, Event::Empty(BytesStart::new("Hangup")))?;
                }
            }
        }

        write(&mut writer, Event::End(BytesEnd::new("Response")))?;

        String::from_utf8(writer.into_inner()).map_err(|e| TwimlError::Encoding {
            details: e.to_string(),
        })
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), TwimlError> {
    writer.write_event(event).map_err(|e| TwimlError::Write {
        details: e.to_string(),
    })
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    name: &str,
    text: &str,
) -> Result<(), TwimlError> {
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

/// A rendered TwiML document ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwimlResponse(pub String);

impl IntoResponse for TwimlResponse {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SayVoice {
        SayVoice {
            voice: "alice".to_string(),
            language: "en-US".to_string(),
        }
    }

    #[test]
    fn empty_document() {
        let xml = Twiml::new().render().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.ends_with("<Response></Response>"));
    }

    #[test]
    fn renders_verbs_in_order() {
        let xml = Twiml::new()
            .say_with(&alice(), "Hello!")
            .gather(Gather::speech("/process-speech", 5))
            .say("Goodbye.")
            .hangup()
            .render()
            .unwrap();

        let say = xml.find(r#"<Say voice="alice" language="en-US">Hello!</Say>"#);
        let gather = xml.find(r#"<Gather input="speech" action="/process-speech" method="POST" timeout="5" speechTimeout="auto" speechModel="phone_call"/>"#);
        let bye = xml.find("<Say>Goodbye.</Say>");
        let hangup = xml.find("<Hangup/>");

        assert!(say.is_some() && gather.is_some() && bye.is_some() && hangup.is_some(), "{xml}");
        assert!(say < gather && gather < bye && bye < hangup);
    }

    #[test]
    fn escapes_text() {
        let xml = Twiml::new().say("Tom & Jerry <3").render().unwrap();
        assert!(xml.contains("<Say>Tom &amp; Jerry &lt;3</Say>"), "{xml}");
    }

    #[test]
    fn play_carries_url() {
        let xml = Twiml::new()
            .play("data:audio/mpeg;base64,SUQz")
            .render()
            .unwrap();
        assert!(xml.contains("<Play>data:audio/mpeg;base64,SUQz</Play>"));
    }
}
