//! Language-model access for phone-agent.
//!
//! This crate provides:
//!
//! - **Backend**: the `LlmBackend` trait and request/message types
//! - **xAI client**: chat-completions over HTTP
//! - **Fail-open replies**: categorized spoken apologies when the model fails
//! - **Sentiment**: one-word classification of caller speech

pub mod backend;
pub mod error;
pub mod prompt;
pub mod reply;
pub mod sentiment;
pub mod xai;

pub use backend::{LlmBackend, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole};
pub use error::{ClientError, LlmError};
pub use prompt::PHONE_AGENT_SYSTEM_PROMPT;
pub use reply::{FallbackCategory, ReplyOutcome, generate_reply};
pub use sentiment::{Sentiment, analyze_sentiment};
pub use xai::{XaiClient, XaiConfig};
