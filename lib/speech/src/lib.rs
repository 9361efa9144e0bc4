//! Speech synthesis for phone-agent.
//!
//! This crate provides:
//!
//! - **Synthesizer**: the `SpeechSynthesizer` trait and audio types
//! - **ElevenLabs client**: text-to-speech and voice listing over HTTP
//! - **Fail-open synthesis**: one default-voice retry, then text fallback

pub mod elevenlabs;
pub mod error;
pub mod fallback;
pub mod synth;

pub use elevenlabs::{ElevenLabsClient, ElevenLabsConfig, RACHEL_VOICE_ID, VoiceSettings};
pub use error::{SpeechClientError, SynthesisError};
pub use fallback::{AudioResult, VoiceSelection, synthesize_with_fallback};
pub use synth::{AudioClip, SpeechSynthesizer, VoiceInfo};
