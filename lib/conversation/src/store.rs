//! Session storage.
//!
//! The store is the only owner of session state. Every operation takes the
//! map lock exactly once, so an append and a concurrent sweep each apply
//! atomically.

use crate::error::SessionError;
use crate::session::{Session, SessionSummary, Turn};
use async_trait::async_trait;
use chrono::Duration;
use phone_agent_core::{CallId, Clock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Trait for call session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new active session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyExists`] if the call already has one.
    async fn create_session(&self, call_id: &CallId) -> Result<Session, SessionError>;

    /// Returns the existing session for the call, creating it if absent.
    async fn get_or_create_session(&self, call_id: &CallId) -> Result<Session, SessionError>;

    /// Looks up a session without side effects.
    async fn get_session(&self, call_id: &CallId) -> Result<Option<Session>, SessionError>;

    /// Records an exchange, creating the session if absent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyUtterance`] if `user_utterance` is blank.
    async fn append_turn(
        &self,
        call_id: &CallId,
        user_utterance: &str,
        agent_reply: &str,
    ) -> Result<Turn, SessionError>;

    /// Marks a session ended. Returns false if there was none.
    async fn end_session(&self, call_id: &CallId) -> Result<bool, SessionError>;

    /// Deletes a session. Returns false if there was none.
    async fn remove_session(&self, call_id: &CallId) -> Result<bool, SessionError>;

    /// Summarizes a session for status surfaces.
    async fn summarize(&self, call_id: &CallId) -> Result<Option<SessionSummary>, SessionError>;

    /// Removes sessions idle for strictly longer than `max_age`.
    ///
    /// Returns the number of sessions removed.
    async fn sweep_expired(&self, max_age: Duration) -> Result<usize, SessionError>;

    /// Number of stored sessions.
    async fn len(&self) -> Result<usize, SessionError>;
}

/// Process-local session store. State is lost on restart.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<CallId, Session>>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    /// Creates an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, call_id: &CallId) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(call_id) {
            return Err(SessionError::AlreadyExists {
                call_id: call_id.clone(),
            });
        }

        let session = Session::new(call_id.clone(), self.clock.now());
        sessions.insert(call_id.clone(), session.clone());
        info!(call_id = %call_id, "created call session");
        Ok(session)
    }

    async fn get_or_create_session(&self, call_id: &CallId) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(call_id.clone()).or_insert_with(|| {
            info!(call_id = %call_id, "created call session");
            Session::new(call_id.clone(), self.clock.now())
        });
        Ok(session.clone())
    }

    async fn get_session(&self, call_id: &CallId) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().await.get(call_id).cloned())
    }

    async fn append_turn(
        &self,
        call_id: &CallId,
        user_utterance: &str,
        agent_reply: &str,
    ) -> Result<Turn, SessionError> {
        if user_utterance.trim().is_empty() {
            return Err(SessionError::EmptyUtterance {
                call_id: call_id.clone(),
            });
        }

        let now = self.clock.now();
        let turn = Turn::new(user_utterance, agent_reply, now);

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(call_id.clone()).or_insert_with(|| {
            debug!(call_id = %call_id, "appending to unknown call, creating session");
            Session::new(call_id.clone(), now)
        });
        session.push_turn(turn.clone());
        debug!(call_id = %call_id, turns = session.turn_count(), "appended turn");
        Ok(turn)
    }

    async fn end_session(&self, call_id: &CallId) -> Result<bool, SessionError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(call_id) {
            Some(session) => {
                session.end(now);
                info!(call_id = %call_id, turns = session.turn_count(), "call session ended");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_session(&self, call_id: &CallId) -> Result<bool, SessionError> {
        let removed = self.sessions.write().await.remove(call_id).is_some();
        if removed {
            info!(call_id = %call_id, "removed call session");
        }
        Ok(removed)
    }

    async fn summarize(&self, call_id: &CallId) -> Result<Option<SessionSummary>, SessionError> {
        let now = self.clock.now();
        Ok(self
            .sessions
            .read()
            .await
            .get(call_id)
            .map(|session| session.summary(now)))
    }

    async fn sweep_expired(&self, max_age: Duration) -> Result<usize, SessionError> {
        let Some(cutoff) = self.clock.now().checked_sub_signed(max_age) else {
            // Older than any representable instant: nothing can be that idle.
            debug!(max_age_secs = max_age.num_seconds(), "sweep cutoff out of range");
            return Ok(0);
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle_since(cutoff));
        let removed = before - sessions.len();

        if removed > 0 {
            info!(removed, remaining = sessions.len(), "swept expired call sessions");
        }
        Ok(removed)
    }

    async fn len(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;
    use phone_agent_core::ManualClock;

    fn store_with_clock() -> (InMemorySessionStore, ManualClock) {
        let clock = ManualClock::starting_now();
        (InMemorySessionStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn create_then_get_is_active_and_empty() {
        let store = InMemorySessionStore::new();
        let call = CallId::new("CA123");

        store.create_session(&call).await.unwrap();
        let session = store.get_session(&call).await.unwrap().unwrap();

        assert_eq!(session.call_id, call);
        assert_eq!(session.status, SessionStatus::Active);
        assert!(session.turns.is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemorySessionStore::new();
        let call = CallId::new("CA1");
        store.create_session(&call).await.unwrap();
        store.append_turn(&call, "hi", "hello").await.unwrap();

        let err = store.create_session(&call).await.unwrap_err();

        assert_eq!(err, SessionError::AlreadyExists { call_id: call.clone() });
        let session = store.get_session(&call).await.unwrap().unwrap();
        assert_eq!(session.turn_count(), 1);
    }

    #[tokio::test]
    async fn get_or_create_keeps_existing_transcript() {
        let store = InMemorySessionStore::new();
        let call = CallId::new("CA1");
        store.append_turn(&call, "hi", "hello").await.unwrap();

        let session = store.get_or_create_session(&call).await.unwrap();

        assert_eq!(session.turn_count(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_session_has_no_side_effect() {
        let store = InMemorySessionStore::new();

        assert!(store.get_session(&CallId::new("nope")).await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn append_creates_missing_session() {
        let store = InMemorySessionStore::new();
        let call = CallId::new("CA9");

        store.append_turn(&call, "Hello", "Hi there").await.unwrap();

        let session = store.get_session(&call).await.unwrap().unwrap();
        assert_eq!(session.turns[0].user_utterance, "Hello");
    }

    #[tokio::test]
    async fn blank_utterance_is_rejected() {
        let store = InMemorySessionStore::new();
        let call = CallId::new("CA1");

        let err = store.append_turn(&call, "   ", "reply").await.unwrap_err();

        assert!(matches!(err, SessionError::EmptyUtterance { .. }));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn summarize_counts_turns_and_reports_last() {
        let (store, clock) = store_with_clock();
        let call = CallId::new("CA1");
        store.create_session(&call).await.unwrap();

        for n in 1..=5 {
            clock.advance(Duration::seconds(10));
            store
                .append_turn(&call, &format!("utterance {n}"), &format!("reply {n}"))
                .await
                .unwrap();
        }

        let summary = store.summarize(&call).await.unwrap().unwrap();
        assert_eq!(summary.message_count, 5);
        assert_eq!(summary.duration_seconds, 50);
        let last = summary.last_message.unwrap();
        assert_eq!(last.user_utterance, "utterance 5");
        assert_eq!(last.agent_reply, "reply 5");
    }

    #[tokio::test]
    async fn summarize_missing_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.summarize(&CallId::new("CA0")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ended_duration_stops_at_end() {
        let (store, clock) = store_with_clock();
        let call = CallId::new("CA1");
        store.create_session(&call).await.unwrap();

        clock.advance(Duration::seconds(30));
        assert!(store.end_session(&call).await.unwrap());
        clock.advance(Duration::hours(2));

        let summary = store.summarize(&call).await.unwrap().unwrap();
        assert_eq!(summary.status, SessionStatus::Ended);
        assert_eq!(summary.duration_seconds, 30);
    }

    #[tokio::test]
    async fn end_and_remove_missing_are_noops() {
        let store = InMemorySessionStore::new();
        let call = CallId::new("CA404");

        assert!(!store.end_session(&call).await.unwrap());
        assert!(!store.remove_session(&call).await.unwrap());
    }

    #[tokio::test]
    async fn remove_deletes_session() {
        let store = InMemorySessionStore::new();
        let call = CallId::new("CA1");
        store.create_session(&call).await.unwrap();

        assert!(store.remove_session(&call).await.unwrap());
        assert!(store.get_session(&call).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_removes_only_strictly_older_sessions() {
        let (store, clock) = store_with_clock();
        let stale = CallId::new("stale");
        let boundary = CallId::new("boundary");
        let fresh = CallId::new("fresh");

        store.create_session(&stale).await.unwrap();
        clock.advance(Duration::seconds(1));
        store.create_session(&boundary).await.unwrap();
        clock.advance(Duration::hours(23));
        store.create_session(&fresh).await.unwrap();

        // `boundary` is now exactly 24h idle, `stale` one second more.
        clock.advance(Duration::hours(1));
        let removed = store.sweep_expired(Duration::hours(24)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.get_session(&stale).await.unwrap().is_none());
        assert!(store.get_session(&boundary).await.unwrap().is_some());
        assert!(store.get_session(&fresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_keys_on_last_activity_not_creation() {
        let (store, clock) = store_with_clock();
        let call = CallId::new("CA1");
        store.create_session(&call).await.unwrap();

        clock.advance(Duration::hours(20));
        store.append_turn(&call, "still here", "ok").await.unwrap();
        clock.advance(Duration::hours(20));

        assert_eq!(store.sweep_expired(Duration::hours(24)).await.unwrap(), 0);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ended_sessions_linger_until_swept() {
        let (store, clock) = store_with_clock();
        let call = CallId::new("CA1");
        store.create_session(&call).await.unwrap();
        store.end_session(&call).await.unwrap();

        clock.advance(Duration::hours(1));
        assert_eq!(store.sweep_expired(Duration::hours(24)).await.unwrap(), 0);

        clock.advance(Duration::hours(24));
        assert_eq!(store.sweep_expired(Duration::hours(24)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retention_of_ended_call_counts_from_last_turn() {
        let (store, clock) = store_with_clock();
        let call = CallId::new("CA1");
        store.append_turn(&call, "hello", "hi").await.unwrap();

        clock.advance(Duration::hours(20));
        store.end_session(&call).await.unwrap();
        clock.advance(Duration::hours(4) + Duration::seconds(1));

        assert_eq!(store.sweep_expired(Duration::hours(24)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sweep_with_unrepresentable_cutoff_removes_nothing() {
        let (store, _clock) = store_with_clock();
        store.create_session(&CallId::new("CA1")).await.unwrap();

        let removed = store
            .sweep_expired(Duration::days(1_000_000_000))
            .await
            .unwrap();

        assert_eq!(removed, 0);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_on_different_calls() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut handles = Vec::new();
        for n in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let call = CallId::new(format!("CA{n}"));
                for i in 0..10 {
                    store
                        .append_turn(&call, &format!("u{i}"), &format!("r{i}"))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await.unwrap(), 16);
        let summary = store.summarize(&CallId::new("CA7")).await.unwrap().unwrap();
        assert_eq!(summary.message_count, 10);
    }
}
