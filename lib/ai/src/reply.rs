//! Fail-open reply generation.
//!
//! A phone caller must always hear something, so a backend failure turns into
//! a fixed spoken apology instead of an error. The apology depends on the
//! failure category.

use crate::backend::{LlmBackend, LlmRequest};
use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Spoken when the provider rejects our credentials.
pub const AUTH_FAILURE_REPLY: &str =
    "I apologize, but there seems to be an authentication issue. Please contact support.";

/// Spoken when the provider is rate limiting us.
pub const RATE_LIMITED_REPLY: &str =
    "I'm currently experiencing high demand. Please try again in a moment.";

/// Spoken for every other upstream failure.
pub const GENERIC_FAILURE_REPLY: &str = "I apologize, but I'm having trouble processing your request right now. Could you please try again?";

/// Failure category that selected a fallback reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCategory {
    /// Authentication rejected.
    AuthFailure,
    /// Rate limited.
    RateLimited,
    /// Timeout, malformed response, transport or other upstream error.
    Generic,
}

impl FallbackCategory {
    /// Classifies a backend error.
    #[must_use]
    pub fn of(error: &LlmError) -> Self {
        if error.is_auth_failure() {
            Self::AuthFailure
        } else if error.is_rate_limited() {
            Self::RateLimited
        } else {
            Self::Generic
        }
    }

    /// The fixed text spoken for this category.
    #[must_use]
    pub fn reply_text(self) -> &'static str {
        match self {
            Self::AuthFailure => AUTH_FAILURE_REPLY,
            Self::RateLimited => RATE_LIMITED_REPLY,
            Self::Generic => GENERIC_FAILURE_REPLY,
        }
    }
}

/// The outcome of asking the model for a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// The model answered.
    Generated { text: String },
    /// The model failed and a fixed apology was substituted.
    Fallback {
        category: FallbackCategory,
        text: String,
    },
}

impl ReplyOutcome {
    /// Builds the fallback outcome for a backend error.
    #[must_use]
    pub fn from_error(error: &LlmError) -> Self {
        let category = FallbackCategory::of(error);
        Self::Fallback {
            category,
            text: category.reply_text().to_string(),
        }
    }

    /// The text to speak, whichever branch was taken.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Generated { text } | Self::Fallback { text, .. } => text,
        }
    }

    /// Consumes the outcome, returning the text.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Generated { text } | Self::Fallback { text, .. } => text,
        }
    }
}

/// Asks `backend` for a reply, bounded by `timeout`, never failing.
pub async fn generate_reply(
    backend: &dyn LlmBackend,
    request: &LlmRequest,
    timeout: Duration,
) -> ReplyOutcome {
    let result = match tokio::time::timeout(timeout, backend.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout),
    };

    match result {
        Ok(response) => ReplyOutcome::Generated {
            text: response.content,
        },
        Err(error) => {
            warn!(
                error = %error,
                provider = ?backend.provider(),
                "language model failed, substituting fallback reply"
            );
            ReplyOutcome::from_error(&error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmProvider, LlmResponse, TokenUsage};
    use async_trait::async_trait;

    struct FixedBackend(Result<&'static str, LlmError>);

    #[async_trait]
    impl LlmBackend for FixedBackend {
        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.0.clone().map(|content| LlmResponse {
                content: content.to_string(),
                usage: TokenUsage::default(),
                model: "fixed".to_string(),
            })
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    struct StalledBackend;

    #[async_trait]
    impl LlmBackend for StalledBackend {
        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(LlmError::RequestFailed {
                reason: "unreachable".to_string(),
            })
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "stalled"
        }
    }

    #[test]
    fn categories_have_distinct_texts() {
        let auth = FallbackCategory::AuthFailure.reply_text();
        let limited = FallbackCategory::RateLimited.reply_text();
        let generic = FallbackCategory::Generic.reply_text();
        assert_ne!(auth, limited);
        assert_ne!(auth, generic);
        assert_ne!(limited, generic);
    }

    #[test]
    fn auth_and_rate_limit_have_own_categories() {
        assert_eq!(
            FallbackCategory::of(&LlmError::Unauthorized { status: 401 }),
            FallbackCategory::AuthFailure
        );
        assert_eq!(
            FallbackCategory::of(&LlmError::RateLimited {
                retry_after_secs: Some(3)
            }),
            FallbackCategory::RateLimited
        );
    }

    #[test]
    fn timeout_and_parse_failures_are_generic() {
        assert_eq!(FallbackCategory::of(&LlmError::Timeout), FallbackCategory::Generic);
        assert_eq!(
            FallbackCategory::of(&LlmError::ResponseParseFailed {
                reason: "bad json".to_string()
            }),
            FallbackCategory::Generic
        );
    }

    #[tokio::test]
    async fn success_passes_text_through() {
        let backend = FixedBackend(Ok("Hi there, how can I help?"));
        let outcome =
            generate_reply(&backend, &LlmRequest::new("Hello"), Duration::from_secs(10)).await;
        assert_eq!(
            outcome,
            ReplyOutcome::Generated {
                text: "Hi there, how can I help?".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rate_limit_becomes_high_demand_apology() {
        let backend = FixedBackend(Err(LlmError::RateLimited {
            retry_after_secs: None,
        }));
        let outcome =
            generate_reply(&backend, &LlmRequest::new("Hello"), Duration::from_secs(10)).await;
        assert!(matches!(
            outcome,
            ReplyOutcome::Fallback {
                category: FallbackCategory::RateLimited,
                ..
            }
        ));
        assert_eq!(outcome.text(), RATE_LIMITED_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_hits_the_deadline() {
        let outcome = generate_reply(
            &StalledBackend,
            &LlmRequest::new("Hello"),
            Duration::from_secs(10),
        )
        .await;
        assert_eq!(
            outcome,
            ReplyOutcome::Fallback {
                category: FallbackCategory::Generic,
                text: GENERIC_FAILURE_REPLY.to_string()
            }
        );
    }
}
