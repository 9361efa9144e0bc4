//! Error types for the conversation crate.

use phone_agent_core::CallId;
use std::fmt;

/// Errors from session store operations.
///
/// A missing session is not an error: lookups return `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session for this call is already stored.
    AlreadyExists { call_id: CallId },
    /// The caller utterance was blank.
    EmptyUtterance { call_id: CallId },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists { call_id } => {
                write!(f, "session already exists for call {call_id}")
            }
            Self::EmptyUtterance { call_id } => {
                write!(f, "refusing to record an empty utterance for call {call_id}")
            }
        }
    }
}

impl std::error::Error for SessionError {}
