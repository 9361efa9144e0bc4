//! Identifier types for call sessions.
//!
//! Call identifiers come from the carrier and are treated as opaque strings.
//! Turn identifiers are generated locally as ULIDs, so they sort by creation
//! time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Carrier-supplied identifier for one phone call (Twilio's `CallSid`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Wraps a carrier identifier as-is.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CallId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError {
                id_type: "CallId",
                reason: "call identifier is empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for CallId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for one utterance/reply exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(Ulid);

impl TurnId {
    const PREFIX: &'static str = "turn";

    /// Creates a new ID with a randomly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl FromStr for TurnId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(Self::PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);

        Ulid::from_str(raw).map(Self).map_err(|e| ParseIdError {
            id_type: "TurnId",
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_id_displays_raw_value() {
        let id = CallId::new("CA123");
        assert_eq!(id.to_string(), "CA123");
        assert_eq!(id.as_str(), "CA123");
    }

    #[test]
    fn call_id_rejects_blank_input() {
        let err = "   ".parse::<CallId>().unwrap_err();
        assert_eq!(err.id_type, "CallId");
    }

    #[test]
    fn call_id_parse_trims_whitespace() {
        let id: CallId = " CA999 ".parse().expect("should parse");
        assert_eq!(id, CallId::from("CA999"));
    }

    #[test]
    fn call_id_serializes_transparently() {
        let json = serde_json::to_string(&CallId::new("CA1")).expect("serialize");
        assert_eq!(json, "\"CA1\"");
    }

    #[test]
    fn turn_id_display_format() {
        let id = TurnId::new();
        assert!(id.to_string().starts_with("turn_"));
    }

    #[test]
    fn turn_id_parses_with_and_without_prefix() {
        let id = TurnId::new();
        let with_prefix: TurnId = id.to_string().parse().expect("should parse");
        let without: TurnId = id.as_ulid().to_string().parse().expect("should parse");
        assert_eq!(id, with_prefix);
        assert_eq!(id, without);
    }

    #[test]
    fn turn_id_rejects_garbage() {
        let err = "turn_nope".parse::<TurnId>().unwrap_err();
        assert_eq!(err.id_type, "TurnId");
    }
}
