//! Call conversation state for phone-agent.
//!
//! This crate provides:
//!
//! - **Session Store**: per-call transcripts, keyed by call identifier
//! - **Context Windower**: bounded model history from a transcript
//! - **Reply Pipeline**: utterance to reply text and audio, failing open

pub mod context;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod store;

pub use context::{DEFAULT_CONTEXT_TURNS, build_context};
pub use error::SessionError;
pub use pipeline::{PipelineConfig, PipelineReply, REPROMPT_TEXT, ReplyPipeline, ReplySource};
pub use session::{Session, SessionStatus, SessionSummary, Turn};
pub use store::{InMemorySessionStore, SessionStore};
