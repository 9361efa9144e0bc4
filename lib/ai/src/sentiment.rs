//! One-word sentiment classification of caller utterances.

use crate::backend::{LlmBackend, LlmRequest};
use crate::prompt::SENTIMENT_SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Coarse sentiment of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Reads a model answer. Anything unrecognised is neutral.
    #[must_use]
    pub fn from_answer(answer: &str) -> Self {
        let answer = answer.trim().to_lowercase();
        if answer.contains("positive") {
            Self::Positive
        } else if answer.contains("negative") {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        })
    }
}

/// Classifies `message`, falling back to [`Sentiment::Neutral`] on any failure.
pub async fn analyze_sentiment(backend: &dyn LlmBackend, message: &str) -> Sentiment {
    let request = LlmRequest::new(message)
        .with_system(SENTIMENT_SYSTEM_PROMPT)
        .with_max_tokens(10)
        .with_temperature(0.3);

    match backend.generate(&request).await {
        Ok(response) => Sentiment::from_answer(&response.content),
        Err(error) => {
            warn!(error = %error, "sentiment analysis failed, assuming neutral");
            Sentiment::Neutral
        }
    }
}
