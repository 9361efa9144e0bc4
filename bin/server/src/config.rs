//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! Vendor settings live with their clients: see
//! [`XaiConfig`](phone_agent_ai::XaiConfig) and
//! [`ElevenLabsConfig`](phone_agent_speech::ElevenLabsConfig).

use phone_agent_ai::{PHONE_AGENT_SYSTEM_PROMPT, XaiConfig};
use phone_agent_conversation::{DEFAULT_CONTEXT_TURNS, PipelineConfig};
use phone_agent_scheduler::SweepConfig;
use phone_agent_speech::ElevenLabsConfig;
use serde::Deserialize;
use std::time::Duration;

use crate::twiml::SayVoice;

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listen address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Language model.
    pub xai: XaiConfig,

    /// Speech synthesis.
    pub elevenlabs: ElevenLabsConfig,

    /// Session retention and history.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Carrier behaviour.
    #[serde(default)]
    pub telephony: TelephonyConfig,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Conversation-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Trailing turns sent to the model as history.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Sessions idle longer than this are swept.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,

    /// Interval between sweeps, in seconds.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Delete the session as soon as the carrier reports hangup, instead of
    /// letting it age out.
    #[serde(default)]
    pub remove_on_hangup: bool,
}

fn default_context_turns() -> usize {
    DEFAULT_CONTEXT_TURNS
}

fn default_max_age_hours() -> u64 {
    24
}

fn default_sweep_interval_seconds() -> u64 {
    3600
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_turns: default_context_turns(),
            max_age_hours: default_max_age_hours(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            remove_on_hangup: false,
        }
    }
}

impl ConversationConfig {
    #[must_use]
    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            interval: Duration::from_secs(self.sweep_interval_seconds),
            max_age: Duration::from_secs(self.max_age_hours.saturating_mul(60 * 60)),
        }
    }
}

/// Telephony-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelephonyConfig {
    /// Recognition confidence below this triggers a re-prompt.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Carrier voice for `<Say>`.
    #[serde(default = "default_say_voice")]
    pub say_voice: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Silence allowed before a gather gives up, in seconds.
    #[serde(default = "default_gather_timeout_seconds")]
    pub gather_timeout_seconds: u32,
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_say_voice() -> String {
    "alice".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_gather_timeout_seconds() -> u32 {
    5
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            say_voice: default_say_voice(),
            language: default_language(),
            gather_timeout_seconds: default_gather_timeout_seconds(),
        }
    }
}

impl TelephonyConfig {
    #[must_use]
    pub fn say_voice(&self) -> SayVoice {
        SayVoice {
            voice: self.say_voice.clone(),
            language: self.language.clone(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Address to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pipeline tuning derived from the vendor and conversation settings.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            system_prompt: PHONE_AGENT_SYSTEM_PROMPT.to_string(),
            context_turns: self.conversation.context_turns,
            llm_timeout: self.xai.timeout(),
            synthesis_timeout: self.elevenlabs.timeout(),
            voices: self.elevenlabs.voice_selection(),
        }
    }
}
