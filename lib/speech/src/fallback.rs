//! Fail-open synthesis.
//!
//! When synthesis fails the caller-facing layer still needs the words, so a
//! failure is returned as data carrying the original text for the carrier's
//! built-in text-to-speech.

use crate::error::SynthesisError;
use crate::synth::{AudioClip, SpeechSynthesizer};
use std::time::Duration;
use tracing::warn;

/// Which voices to try, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    /// Voice requested for replies.
    pub preferred: String,
    /// Known-good voice retried once if `preferred` fails.
    pub default: String,
}

impl VoiceSelection {
    /// Creates a selection.
    #[must_use]
    pub fn new(preferred: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            preferred: preferred.into(),
            default: default.into(),
        }
    }

    /// A selection with no distinct fallback voice.
    #[must_use]
    pub fn single(voice_id: impl Into<String>) -> Self {
        let voice_id = voice_id.into();
        Self {
            preferred: voice_id.clone(),
            default: voice_id,
        }
    }

    /// Returns true if a failure of the preferred voice warrants a retry.
    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.preferred != self.default
    }
}

/// Audio for a reply, or the text to speak instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioResult {
    /// Synthesis succeeded.
    Synthesized(AudioClip),
    /// Synthesis failed; speak `fallback_text` by other means.
    Failed {
        fallback_text: String,
        reason: String,
    },
}

impl AudioResult {
    /// Returns true if no audio was produced.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The text to speak when synthesis failed.
    #[must_use]
    pub fn fallback_text(&self) -> Option<&str> {
        match self {
            Self::Failed { fallback_text, .. } => Some(fallback_text),
            Self::Synthesized(_) => None,
        }
    }

    /// The synthesized clip, if any.
    #[must_use]
    pub fn clip(&self) -> Option<&AudioClip> {
        match self {
            Self::Synthesized(clip) => Some(clip),
            Self::Failed { .. } => None,
        }
    }
}

async fn attempt(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    voice_id: &str,
    timeout: Duration,
) -> Result<AudioClip, SynthesisError> {
    match tokio::time::timeout(timeout, synthesizer.synthesize(text, voice_id)).await {
        Ok(result) => result,
        Err(_) => Err(SynthesisError::Timeout),
    }
}

/// Synthesizes `text`, retrying once with the default voice, never failing.
pub async fn synthesize_with_fallback(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    voices: &VoiceSelection,
    timeout: Duration,
) -> AudioResult {
    let first = attempt(synthesizer, text, &voices.preferred, timeout).await;

    let error = match first {
        Ok(clip) => return AudioResult::Synthesized(clip),
        Err(error) if voices.has_fallback() => {
            warn!(
                error = %error,
                voice_id = %voices.preferred,
                fallback_voice_id = %voices.default,
                "preferred voice failed, retrying with default voice"
            );
            match attempt(synthesizer, text, &voices.default, timeout).await {
                Ok(clip) => return AudioResult::Synthesized(clip),
                Err(retry_error) => retry_error,
            }
        }
        Err(error) => error,
    };

    warn!(
        error = %error,
        provider = synthesizer.provider_name(),
        "speech synthesis unavailable, falling back to text"
    );
    AudioResult::Failed {
        fallback_text: text.to_string(),
        reason: error.to_string(),
    }
}
