//! The reply pipeline: caller utterance in, speakable reply out.
//!
//! Every external failure is turned into data here. [`ReplyPipeline::handle_utterance`]
//! has no error type; the caller always gets text, and audio when synthesis
//! worked.

use crate::context::{DEFAULT_CONTEXT_TURNS, build_context};
use crate::store::SessionStore;
use phone_agent_ai::{
    FallbackCategory, LlmBackend, LlmRequest, PHONE_AGENT_SYSTEM_PROMPT, ReplyOutcome,
    generate_reply,
};
use phone_agent_core::CallId;
use phone_agent_speech::{
    AudioResult, RACHEL_VOICE_ID, SpeechSynthesizer, VoiceSelection, synthesize_with_fallback,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Spoken when the recognizer produced nothing usable.
pub const REPROMPT_TEXT: &str =
    "I'm sorry, I didn't catch that. Could you please repeat what you said?";

/// Tuning for [`ReplyPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// System instructions sent with every model call.
    pub system_prompt: String,
    /// Trailing turns included as history.
    pub context_turns: usize,
    /// Upper bound on a model call.
    pub llm_timeout: Duration,
    /// Upper bound on one synthesis attempt.
    pub synthesis_timeout: Duration,
    /// Reply voice and its fallback.
    pub voices: VoiceSelection,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            system_prompt: PHONE_AGENT_SYSTEM_PROMPT.to_string(),
            context_turns: DEFAULT_CONTEXT_TURNS,
            llm_timeout: Duration::from_secs(10),
            synthesis_timeout: Duration::from_secs(30),
            voices: VoiceSelection::single(RACHEL_VOICE_ID),
        }
    }
}

/// Where the reply text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// The language model answered.
    Model,
    /// The model failed; a fixed apology was used.
    Fallback(FallbackCategory),
    /// The utterance was blank; the caller was asked to repeat.
    Reprompt,
}

impl From<&ReplyOutcome> for ReplySource {
    fn from(outcome: &ReplyOutcome) -> Self {
        match outcome {
            ReplyOutcome::Generated { .. } => Self::Model,
            ReplyOutcome::Fallback { category, .. } => Self::Fallback(*category),
        }
    }
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => f.write_str("model"),
            Self::Fallback(category) => write!(f, "fallback:{category:?}"),
            Self::Reprompt => f.write_str("reprompt"),
        }
    }
}

/// The result of handling one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReply {
    pub call_id: CallId,
    /// What to say to the caller.
    pub text: String,
    /// Audio of `text`, or the failure to render it.
    pub audio: AudioResult,
    pub reply_source: ReplySource,
}

/// Orchestrates store, model and synthesizer for one call exchange.
#[derive(Clone)]
pub struct ReplyPipeline {
    store: Arc<dyn SessionStore>,
    llm: Arc<dyn LlmBackend>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: PipelineConfig,
}

impl fmt::Debug for ReplyPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyPipeline")
            .field("model", &self.llm.model())
            .field("synthesizer", &self.synthesizer.provider_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReplyPipeline {
    /// Creates a pipeline over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn LlmBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            llm,
            synthesizer,
            config,
        }
    }

    /// The session store this pipeline writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handles one caller utterance. Never fails.
    #[instrument(skip_all, fields(call_id = %call_id))]
    pub async fn handle_utterance(&self, call_id: &CallId, utterance: &str) -> PipelineReply {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return PipelineReply {
                call_id: call_id.clone(),
                text: REPROMPT_TEXT.to_string(),
                audio: AudioResult::Failed {
                    fallback_text: REPROMPT_TEXT.to_string(),
                    reason: "blank utterance".to_string(),
                },
                reply_source: ReplySource::Reprompt,
            };
        }

        // History is read before this exchange is recorded.
        let context = match self.store.get_or_create_session(call_id).await {
            Ok(session) => build_context(&session, self.config.context_turns),
            Err(error) => {
                warn!(error = %error, "session lookup failed, replying without history");
                Vec::new()
            }
        };

        let request = LlmRequest::new(utterance)
            .with_system(self.config.system_prompt.clone())
            .with_context(context);
        let outcome = generate_reply(self.llm.as_ref(), &request, self.config.llm_timeout).await;
        let reply_source = ReplySource::from(&outcome);
        let text = outcome.into_text();

        if let Err(error) = self.store.append_turn(call_id, utterance, &text).await {
            warn!(error = %error, "failed to record turn");
        }

        let audio = synthesize_with_fallback(
            self.synthesizer.as_ref(),
            &text,
            &self.config.voices,
            self.config.synthesis_timeout,
        )
        .await;

        info!(
            reply_source = %reply_source,
            audio = !audio.is_failed(),
            "handled caller utterance"
        );

        PipelineReply {
            call_id: call_id.clone(),
            text,
            audio,
            reply_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySessionStore;
    use async_trait::async_trait;
    use phone_agent_ai::backend::{LlmProvider, LlmResponse, TokenUsage};
    use phone_agent_ai::{LlmError, LlmMessage};
    use phone_agent_speech::{AudioClip, SynthesisError, VoiceInfo};
    use std::sync::Mutex;

    enum Script {
        Reply(&'static str),
        Fail(LlmError),
        Stall,
    }

    struct ScriptedLlm {
        script: Script,
        seen: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<LlmRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedLlm {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.script {
                Script::Reply(text) => Ok(LlmResponse {
                    content: (*text).to_string(),
                    usage: TokenUsage::default(),
                    model: "grok-test".to_string(),
                }),
                Script::Fail(error) => Err(error.clone()),
                Script::Stall => {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    Err(LlmError::Timeout)
                }
            }
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Xai
        }

        fn model(&self) -> &str {
            "grok-test"
        }
    }

    struct FakeSynth {
        fail: bool,
        spoken: Mutex<Vec<String>>,
    }

    impl FakeSynth {
        fn working() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                spoken: Mutex::new(Vec::new()),
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                spoken: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        async fn synthesize(&self, text: &str, voice_id: &str) -> Result<AudioClip, SynthesisError> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(SynthesisError::RequestFailed {
                    reason: "HTTP 500".to_string(),
                });
            }
            Ok(AudioClip {
                bytes: b"ID3fake-mp3".to_vec(),
                content_type: "audio/mpeg".to_string(),
                voice_id: voice_id.to_string(),
            })
        }

        async fn list_voices(&self) -> Result<Vec<VoiceInfo>, SynthesisError> {
            Ok(Vec::new())
        }

        fn provider_name(&self) -> &str {
            "fake"
        }
    }

    fn pipeline(
        llm: Arc<ScriptedLlm>,
        synth: Arc<FakeSynth>,
    ) -> (ReplyPipeline, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let pipeline = ReplyPipeline::new(
            store.clone(),
            llm,
            synth,
            PipelineConfig::default(),
        );
        (pipeline, store)
    }

    #[tokio::test]
    async fn hello_on_new_call_end_to_end() {
        let llm = ScriptedLlm::new(Script::Reply("Hi there, how can I help?"));
        let synth = FakeSynth::working();
        let (pipeline, store) = pipeline(llm.clone(), synth.clone());
        let call = CallId::new("CA123");

        let reply = pipeline.handle_utterance(&call, "Hello").await;

        assert_eq!(reply.text, "Hi there, how can I help?");
        assert_eq!(reply.reply_source, ReplySource::Model);
        assert_eq!(
            reply.audio.clip().map(|clip| clip.bytes.as_slice()),
            Some(&b"ID3fake-mp3"[..])
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].context.is_empty());
        assert_eq!(requests[0].prompt, "Hello");
        assert_eq!(requests[0].system.as_deref(), Some(PHONE_AGENT_SYSTEM_PROMPT));

        let session = store.get_session(&call).await.unwrap().unwrap();
        assert_eq!(session.turn_count(), 1);
        assert_eq!(session.turns[0].user_utterance, "Hello");
        assert_eq!(session.turns[0].agent_reply, "Hi there, how can I help?");
        assert_eq!(synth.spoken.lock().unwrap().as_slice(), ["Hi there, how can I help?"]);
    }

    #[tokio::test]
    async fn context_excludes_current_utterance() {
        let llm = ScriptedLlm::new(Script::Reply("ok"));
        let (pipeline, _store) = pipeline(llm.clone(), FakeSynth::working());
        let call = CallId::new("CA1");

        pipeline.handle_utterance(&call, "first").await;
        pipeline.handle_utterance(&call, "second").await;

        let requests = llm.requests();
        assert_eq!(
            requests[1].context,
            vec![LlmMessage::user("first"), LlmMessage::assistant("ok")]
        );
        assert_eq!(requests[1].prompt, "second");
    }

    #[tokio::test]
    async fn context_is_bounded() {
        let llm = ScriptedLlm::new(Script::Reply("ok"));
        let (pipeline, _store) = pipeline(llm.clone(), FakeSynth::working());
        let call = CallId::new("CA1");

        for n in 0..6 {
            pipeline.handle_utterance(&call, &format!("u{n}")).await;
        }

        let last = llm.requests().pop().unwrap();
        assert_eq!(last.context.len(), 2 * DEFAULT_CONTEXT_TURNS);
        assert_eq!(last.context[0].content, "u1");
    }

    async fn fallback_text_for(error: LlmError) -> PipelineReply {
        let (pipeline, _store) = pipeline(ScriptedLlm::new(Script::Fail(error)), FakeSynth::working());
        pipeline.handle_utterance(&CallId::new("CA1"), "Hello").await
    }

    #[tokio::test]
    async fn model_failures_yield_distinct_fallbacks() {
        let auth = fallback_text_for(LlmError::Unauthorized { status: 401 }).await;
        let limited = fallback_text_for(LlmError::RateLimited {
            retry_after_secs: Some(3),
        })
        .await;
        let malformed = fallback_text_for(LlmError::ResponseParseFailed {
            reason: "expected value at line 1".to_string(),
        })
        .await;

        assert_eq!(
            auth.reply_source,
            ReplySource::Fallback(FallbackCategory::AuthFailure)
        );
        assert_eq!(
            limited.reply_source,
            ReplySource::Fallback(FallbackCategory::RateLimited)
        );
        assert_eq!(
            malformed.reply_source,
            ReplySource::Fallback(FallbackCategory::Generic)
        );

        for reply in [&auth, &limited, &malformed] {
            assert!(!reply.text.is_empty());
        }
        assert_ne!(auth.text, limited.text);
        assert_ne!(auth.text, malformed.text);
        assert_ne!(limited.text, malformed.text);
    }

    #[tokio::test(start_paused = true)]
    async fn model_timeout_yields_generic_fallback_and_records_turn() {
        let (pipeline, store) = pipeline(ScriptedLlm::new(Script::Stall), FakeSynth::working());
        let call = CallId::new("CA1");

        let reply = pipeline.handle_utterance(&call, "Hello").await;

        assert_eq!(reply.reply_source, ReplySource::Fallback(FallbackCategory::Generic));
        assert_eq!(reply.text, FallbackCategory::Generic.reply_text());
        assert!(!reply.audio.is_failed());
        let session = store.get_session(&call).await.unwrap().unwrap();
        assert_eq!(session.turns[0].agent_reply, reply.text);
    }

    #[tokio::test]
    async fn synthesis_failure_carries_reply_text() {
        let llm = ScriptedLlm::new(Script::Reply("Let me check that for you."));
        let (pipeline, _store) = pipeline(llm, FakeSynth::broken());

        let reply = pipeline.handle_utterance(&CallId::new("CA1"), "Hello").await;

        assert!(reply.audio.is_failed());
        assert_eq!(reply.audio.fallback_text(), Some("Let me check that for you."));
        assert_eq!(reply.text, "Let me check that for you.");
    }

    #[tokio::test]
    async fn blank_utterance_reprompts_without_side_effects() {
        let llm = ScriptedLlm::new(Script::Reply("unused"));
        let synth = FakeSynth::working();
        let (pipeline, store) = pipeline(llm.clone(), synth.clone());
        let call = CallId::new("CA1");

        let reply = pipeline.handle_utterance(&call, "  ").await;

        assert_eq!(reply.reply_source, ReplySource::Reprompt);
        assert_eq!(reply.text, REPROMPT_TEXT);
        assert!(llm.requests().is_empty());
        assert!(synth.spoken.lock().unwrap().is_empty());
        assert!(store.get_session(&call).await.unwrap().is_none());
    }
}
