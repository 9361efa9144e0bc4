//! Speech synthesizer abstraction.

use crate::error::SynthesisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Content type assumed when a provider does not say.
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Synthesized audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Encoded audio bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub content_type: String,
    /// Voice that produced the audio.
    pub voice_id: String,
}

impl AudioClip {
    /// Length of the encoded audio in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the clip holds no audio.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A voice offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Provider voice identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Provider category (premade, cloned, ...).
    pub category: Option<String>,
}

/// Trait for text-to-speech providers.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` with the given voice.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioClip, SynthesisError>;

    /// Lists the voices available to this account.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried.
    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError>;

    /// Provider name for logs.
    fn provider_name(&self) -> &str;
}
