//! Error types for the scheduler crate.

use phone_agent_conversation::SessionError;
use std::fmt;

/// Errors from a sweep run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    /// The session store refused the sweep.
    Store { source: SessionError },
    /// The configured max age does not fit a calendar duration.
    InvalidMaxAge { seconds: u64 },
    /// The sweep period is zero.
    ZeroInterval,
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { source } => write!(f, "session sweep failed: {source}"),
            Self::InvalidMaxAge { seconds } => {
                write!(f, "max session age of {seconds}s is out of range")
            }
            Self::ZeroInterval => write!(f, "sweep interval must be greater than zero"),
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store { source } => Some(source),
            Self::InvalidMaxAge { .. } | Self::ZeroInterval => None,
        }
    }
}

impl From<SessionError> for SweepError {
    fn from(source: SessionError) -> Self {
        Self::Store { source }
    }
}
