//! Bounded prompt history for the language model.

use crate::session::Session;
use phone_agent_ai::LlmMessage;

/// Number of trailing turns sent to the model by default.
pub const DEFAULT_CONTEXT_TURNS: usize = 4;

/// Builds the model history from the last `max_turns` turns of `session`.
///
/// Each turn contributes a user message followed by an assistant message, so
/// the history alternates in call order.
#[must_use]
pub fn build_context(session: &Session, max_turns: usize) -> Vec<LlmMessage> {
    let skip = session.turns.len().saturating_sub(max_turns);
    session.turns[skip..]
        .iter()
        .flat_map(|turn| {
            [
                LlmMessage::user(turn.user_utterance.clone()),
                LlmMessage::assistant(turn.agent_reply.clone()),
            ]
        })
        .collect()
}
