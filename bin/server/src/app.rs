//! Application state and router.

use crate::config::TelephonyConfig;
use crate::routes;
use axum::Router;
use axum::routing::{get, post};
use phone_agent_ai::LlmBackend;
use phone_agent_conversation::{PipelineConfig, ReplyPipeline, SessionStore};
use phone_agent_speech::SpeechSynthesizer;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    /// Call sessions.
    pub store: Arc<dyn SessionStore>,
    /// Utterance handling over `store`, `llm` and `synthesizer`.
    pub pipeline: ReplyPipeline,
    pub llm: Arc<dyn LlmBackend>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Carrier behaviour.
    pub telephony: TelephonyConfig,
    /// Delete sessions on hangup instead of letting them age out.
    pub remove_on_hangup: bool,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn LlmBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        pipeline_config: PipelineConfig,
        telephony: TelephonyConfig,
        remove_on_hangup: bool,
    ) -> Self {
        let pipeline = ReplyPipeline::new(
            Arc::clone(&store),
            Arc::clone(&llm),
            Arc::clone(&synthesizer),
            pipeline_config,
        );
        Self {
            store,
            pipeline,
            llm,
            synthesizer,
            telephony,
            remove_on_hangup,
            started_at: Instant::now(),
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        // Carrier webhooks
        .route("/voice", post(routes::voice))
        .route("/process-speech", post(routes::process_speech))
        .route("/call-status", post(routes::call_status))
        .route("/process-voice", post(routes::process_voice))
        .route("/transcription", post(routes::transcription))
        // Diagnostics
        .route("/conversations/{call_sid}", get(routes::conversation))
        .route("/test-ai", post(routes::test_ai))
        .route("/test-sentiment", post(routes::test_sentiment))
        .route("/test-tts", post(routes::test_tts))
        .route("/test-voice", get(routes::test_voice))
        .route("/voices", get(routes::voices))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
