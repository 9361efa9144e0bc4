//! Call session records.
//!
//! A session holds the transcript of one phone call. Sessions are owned by a
//! [`SessionStore`](crate::store::SessionStore); everything else sees clones.

use chrono::{DateTime, Duration, Utc};
use phone_agent_core::{CallId, TurnId};
use serde::{Deserialize, Serialize};

/// The state of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The call is in progress.
    #[default]
    Active,
    /// The carrier reported the call finished.
    Ended,
}

impl SessionStatus {
    /// Returns true if the session has ended.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// One utterance/reply exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    /// What the caller said, as recognized by the carrier.
    pub user_utterance: String,
    /// What the agent answered.
    pub agent_reply: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Creates a turn stamped at `timestamp`.
    #[must_use]
    pub fn new(
        user_utterance: impl Into<String>,
        agent_reply: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TurnId::new(),
            user_utterance: user_utterance.into(),
            agent_reply: agent_reply.into(),
            timestamp,
        }
    }
}

/// Conversation state for one phone call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub call_id: CallId,
    /// Exchanges so far, oldest first.
    pub turns: Vec<Turn>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    /// Never moves backwards.
    pub last_activity_at: DateTime<Utc>,
    /// Set once, when the call first ends.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates an active session with no turns.
    #[must_use]
    pub fn new(call_id: CallId, now: DateTime<Utc>) -> Self {
        Self {
            call_id,
            turns: Vec::new(),
            status: SessionStatus::Active,
            created_at: now,
            last_activity_at: now,
            ended_at: None,
        }
    }

    /// Appends a turn and refreshes activity.
    pub fn push_turn(&mut self, turn: Turn) {
        self.touch(turn.timestamp);
        self.turns.push(turn);
    }

    /// Marks the session ended. Ending twice keeps the first end time.
    ///
    /// Activity is left alone, so retention counts from the last turn.
    pub fn end(&mut self, now: DateTime<Utc>) {
        self.status = SessionStatus::Ended;
        if self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = self.last_activity_at.max(now);
    }

    /// Returns the number of turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Returns the most recent turn, if any.
    #[must_use]
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Time from creation to end, or to `now` while the call is live.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let until = self.ended_at.unwrap_or(now);
        (until - self.created_at).max(Duration::zero())
    }

    /// Returns true if the last activity is strictly before `cutoff`.
    #[must_use]
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_activity_at < cutoff
    }

    /// Builds the diagnostic summary as of `now`.
    #[must_use]
    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let elapsed = self.elapsed(now);
        SessionSummary {
            call_id: self.call_id.clone(),
            message_count: self.turn_count(),
            duration_ms: elapsed.num_milliseconds(),
            duration_seconds: elapsed.num_seconds(),
            status: self.status,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
            last_message: self.last_turn().cloned(),
        }
    }
}

/// Read-only view of a session for status surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub call_id: CallId,
    pub message_count: usize,
    pub duration_ms: i64,
    pub duration_seconds: i64,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub last_message: Option<Turn>,
}
