//! Error types for the speech crate.

use std::fmt;

/// Errors from speech-synthesis operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Nothing to synthesize.
    EmptyText,
    /// The provider rejected our credentials.
    Unauthorized { status: u16 },
    /// The requested voice does not exist.
    VoiceNotFound { voice_id: String },
    /// The provider is throttling us.
    RateLimited,
    /// Timeout waiting for audio.
    Timeout,
    /// Transport failure or unexpected status.
    RequestFailed { reason: String },
    /// The provider answered with no audio bytes.
    EmptyAudio,
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyText => write!(f, "no text to synthesize"),
            Self::Unauthorized { status } => {
                write!(f, "speech provider rejected credentials (HTTP {status})")
            }
            Self::VoiceNotFound { voice_id } => write!(f, "voice not found: {voice_id}"),
            Self::RateLimited => write!(f, "speech provider rate limited the request"),
            Self::Timeout => write!(f, "speech synthesis timed out"),
            Self::RequestFailed { reason } => {
                write!(f, "speech synthesis request failed: {reason}")
            }
            Self::EmptyAudio => write!(f, "speech provider returned no audio"),
        }
    }
}

impl std::error::Error for SynthesisError {}

/// Errors raised while constructing a synthesizer client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechClientError {
    /// No API key was configured.
    MissingApiKey,
    /// The HTTP client could not be built.
    HttpClient { details: String },
}

impl fmt::Display for SpeechClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "no API key configured for speech synthesis"),
            Self::HttpClient { details } => {
                write!(f, "failed to build HTTP client: {details}")
            }
        }
    }
}

impl std::error::Error for SpeechClientError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_error_display() {
        let err = SynthesisError::VoiceNotFound {
            voice_id: "custom-voice".to_string(),
        };
        assert!(err.to_string().contains("custom-voice"));
    }
}
