//! ElevenLabs text-to-speech backend.

use crate::error::{SpeechClientError, SynthesisError};
use crate::fallback::VoiceSelection;
use crate::synth::{AudioClip, DEFAULT_AUDIO_CONTENT_TYPE, SpeechSynthesizer, VoiceInfo};
use async_trait::async_trait;
use reqwest::{StatusCode, header};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// ElevenLabs "Rachel", a premade voice every account has.
pub const RACHEL_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Voice tuning sent with every synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default = "default_half")]
    pub stability: f32,
    #[serde(default = "default_half")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,
}

fn default_half() -> f32 {
    0.5
}

fn default_true() -> bool {
    true
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: default_half(),
            similarity_boost: default_half(),
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

/// Configuration for the ElevenLabs backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ElevenLabsConfig {
    /// Value of the `xi-api-key` header.
    pub api_key: String,

    /// API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Voice used for replies.
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// Known-good voice retried once when `voice_id` fails.
    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,

    /// Synthesis model.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Voice tuning.
    #[serde(default)]
    pub voice_settings: VoiceSettings,
}

fn default_base_url() -> String {
    "https://api.elevenlabs.io/v1".to_string()
}

fn default_voice_id() -> String {
    RACHEL_VOICE_ID.to_string()
}

fn default_model_id() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl ElevenLabsConfig {
    /// Creates a configuration with defaults for everything but the key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            voice_id: default_voice_id(),
            default_voice_id: default_voice_id(),
            model_id: default_model_id(),
            timeout_seconds: default_timeout_seconds(),
            voice_settings: VoiceSettings::default(),
        }
    }

    /// Points the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Selects the reply voice.
    #[must_use]
    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    /// Returns the request timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// The reply voice and its fallback.
    #[must_use]
    pub fn voice_selection(&self) -> VoiceSelection {
        VoiceSelection::new(self.voice_id.clone(), self.default_voice_id.clone())
    }
}

#[derive(Debug, Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<ElevenLabsVoice>,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsVoice {
    voice_id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
}

/// HTTP client for the ElevenLabs API.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be
    /// built.
    pub fn new(config: ElevenLabsConfig) -> Result<Self, Report<SpeechClientError>> {
        if config.api_key.trim().is_empty() {
            return Err(SpeechClientError::MissingApiKey.into());
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SpeechClientError::HttpClient {
                details: e.to_string(),
            })?;

        info!(voice_id = %config.voice_id, "ElevenLabs TTS initialized");

        Ok(Self { http, config })
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.config.base_url.trim_end_matches('/'))
    }
}

fn transport_error(e: &reqwest::Error) -> SynthesisError {
    if e.is_timeout() {
        SynthesisError::Timeout
    } else {
        SynthesisError::RequestFailed {
            reason: e.to_string(),
        }
    }
}

fn status_error(status: StatusCode, voice_id: &str) -> SynthesisError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SynthesisError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => SynthesisError::VoiceNotFound {
            voice_id: voice_id.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => SynthesisError::RateLimited,
        other => SynthesisError::RequestFailed {
            reason: format!("HTTP {other}"),
        },
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioClip, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let body = SynthesisBody {
            text,
            model_id: &self.config.model_id,
            voice_settings: &self.config.voice_settings,
        };

        let response = self
            .http
            .post(self.url(&format!("text-to-speech/{voice_id}")))
            .header("xi-api-key", &self.config.api_key)
            .header(header::ACCEPT, DEFAULT_AUDIO_CONTENT_TYPE)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %detail, "ElevenLabs TTS returned error status");
            return Err(status_error(status, voice_id));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_AUDIO_CONTENT_TYPE.to_string());

        let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;
        if bytes.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        debug!(bytes = bytes.len(), "ElevenLabs TTS synthesized audio");

        Ok(AudioClip {
            bytes: bytes.to_vec(),
            content_type,
            voice_id: voice_id.to_string(),
        })
    }

    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
        let response = self
            .http
            .get(self.url("voices"))
            .header("xi-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, ""));
        }

        let voices: VoicesResponse =
            response
                .json()
                .await
                .map_err(|e| SynthesisError::RequestFailed {
                    reason: e.to_string(),
                })?;

        Ok(voices
            .voices
            .into_iter()
            .map(|v| VoiceInfo {
                id: v.voice_id,
                name: v.name,
                category: v.category,
            })
            .collect())
    }

    fn provider_name(&self) -> &str {
        "elevenlabs"
    }
}
