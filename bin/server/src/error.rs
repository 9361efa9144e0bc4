//! Domain error types for server operations.
//!
//! Handler errors are converted to user-safe responses here; details go to
//! the log, never to the caller.

use crate::twiml::{TWIML_CONTENT_TYPE, TwimlError};
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use phone_agent_conversation::SessionError;
use serde_json::json;
use std::fmt;

/// Served when markup cannot be rendered, so the caller still hears something.
pub const FALLBACK_TWIML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "<Response><Say>I apologize, but I'm having technical difficulties. ",
    "Please try calling back later.</Say><Hangup/></Response>"
);

/// Errors raised while bringing the process up.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    Config { details: String },
    /// A vendor client could not be built.
    Client { details: String },
    /// The listener could not bind.
    Bind { addr: String, details: String },
    /// The server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Client { details } => write!(f, "failed to build client: {details}"),
            Self::Bind { addr, details } => {
                write!(f, "failed to bind to {addr}: {details}")
            }
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// Errors returned from JSON endpoints.
#[derive(Debug)]
pub enum ApiError {
    /// A required request field was missing or empty.
    MissingField { field: &'static str },
    /// No conversation for the requested call.
    ConversationNotFound,
    /// The speech provider failed.
    Synthesis { fallback: String, details: String },
    /// The session store failed.
    Store(SessionError),
    /// Markup could not be rendered.
    Markup(TwimlError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "{field} is required"),
            Self::ConversationNotFound => write!(f, "conversation not found"),
            Self::Synthesis { details, .. } => write!(f, "speech synthesis failed: {details}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Markup(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::Store(e)
    }
}

impl From<TwimlError> for ApiError {
    fn from(e: TwimlError) -> Self {
        Self::Markup(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingField { field } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("{} is required", capitalize(field)) })),
            )
                .into_response(),
            Self::ConversationNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Conversation not found" })),
            )
                .into_response(),
            Self::Synthesis { fallback, details } => {
                tracing::error!(error = %details, "TTS request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "TTS service error", "fallback": fallback })),
                )
                    .into_response()
            }
            Self::Store(e) => {
                tracing::error!(error = %e, "session store failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
            Self::Markup(e) => {
                tracing::error!(error = %e, "failed to render TwiML");
                ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], FALLBACK_TWIML).into_response()
            }
        }
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
