//! Core domain types and utilities for phone-agent.
//!
//! This crate provides the identifiers, the injectable clock and the error
//! alias shared by every other phone-agent crate.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Result;
pub use id::{CallId, ParseIdError, TurnId};
