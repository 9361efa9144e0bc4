//! phone-agent webhook server.
//!
//! This crate provides the axum application that answers Twilio voice
//! webhooks, plus a handful of diagnostic endpoints for poking at the vendor
//! integrations by hand.

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod twiml;

pub use app::{AppState, router};
pub use config::ServerConfig;
pub use error::{ApiError, StartupError};
