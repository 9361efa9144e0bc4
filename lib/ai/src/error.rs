//! Error types for the AI crate.
//!
//! - `LlmError`: failures reported by a language-model backend. The
//!   variants are split so the fail-open layer can pick a spoken apology per
//!   category.
//! - `ClientError`: failures building a backend client at startup.

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The provider rejected our credentials (HTTP 401/403).
    Unauthorized { status: u16 },
    /// The provider is throttling us (HTTP 429).
    RateLimited { retry_after_secs: Option<u64> },
    /// Timeout waiting for response.
    Timeout,
    /// Request failed in transport or with an unexpected status.
    RequestFailed { reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
}

impl LlmError {
    /// Returns true if the provider rejected the credentials.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns true if the provider is rate limiting.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { status } => {
                write!(f, "LLM provider rejected credentials (HTTP {status})")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors raised while constructing a backend client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No API key was configured.
    MissingApiKey { provider: &'static str },
    /// The HTTP client could not be built.
    HttpClient { details: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey { provider } => {
                write!(f, "no API key configured for {provider}")
            }
            Self::HttpClient { details } => {
                write!(f, "failed to build HTTP client: {details}")
            }
        }
    }
}

impl std::error::Error for ClientError {}
