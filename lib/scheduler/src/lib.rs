//! Housekeeping for phone-agent.
//!
//! This crate provides:
//!
//! - **Expiry Sweeper**: a recurring task that drops idle call sessions

pub mod error;
pub mod sweeper;

pub use error::SweepError;
pub use sweeper::{ExpirySweeper, SweepConfig};
