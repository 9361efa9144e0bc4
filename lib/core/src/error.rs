//! Error handling foundation for phone-agent.
//!
//! Crates define their own domain error enums (`SessionError`, `LlmError`,
//! `SynthesisError`, ...) and surface them through rootcause reports where a
//! failure has to travel up to startup code. Request-path failures are
//! translated to fallback data long before they reach this alias.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
