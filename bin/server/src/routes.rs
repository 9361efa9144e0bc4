//! HTTP handlers: Twilio webhooks and diagnostic endpoints.

use crate::app::AppState;
use crate::error::ApiError;
use crate::twiml::{Gather, Twiml, TwimlResponse};
use axum::Json;
use axum::extract::{Form, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use phone_agent_ai::{LlmRequest, analyze_sentiment, generate_reply};
use phone_agent_conversation::{PipelineReply, REPROMPT_TEXT};
use phone_agent_core::CallId;
use phone_agent_speech::{AudioResult, synthesize_with_fallback};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

const GREETING: &str = "Hello! Welcome to PhoneAgent. How can I help you today?";
const NO_INPUT: &str = "I didn't hear anything. Let me try connecting you to an agent.";
const GOODBYE: &str = "Goodbye.";
const CLOSING: &str = "Thank you for calling PhoneAgent. Goodbye!";
const RECORDING_RECEIVED: &str = "Voice recording received. We'll process it and get back to you.";
const VOICE_FAILURE: &str =
    "Sorry, we're experiencing technical difficulties. Please try again later.";

/// Call statuses after which no more webhooks arrive for the call.
const TERMINAL_CALL_STATUSES: &[&str] = &["completed", "busy", "failed", "no-answer", "canceled"];

type TwimlResult = Result<TwimlResponse, ApiError>;

fn render(twiml: &Twiml) -> TwimlResult {
    Ok(TwimlResponse(twiml.render()?))
}

fn gather(state: &AppState) -> Gather {
    Gather::speech("/process-speech", state.telephony.gather_timeout_seconds)
}

/// Returns true if recognized speech should reach the pipeline.
///
/// A missing or unparseable confidence does not block the utterance.
pub fn is_usable_speech(speech: Option<&str>, confidence: Option<&str>, min_confidence: f64) -> bool {
    let has_speech = speech.is_some_and(|s| !s.trim().is_empty());
    let confident = confidence
        .and_then(|c| c.trim().parse::<f64>().ok())
        .is_none_or(|c| c >= min_confidence);
    has_speech && confident
}

/// Base64 `data:` URL for inline playback.
pub fn audio_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "PhoneAgent is running!",
        "status": "healthy",
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: f64,
    pub conversations: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let conversations = state.store.len().await.unwrap_or_else(|e| {
        warn!(error = %e, "failed to count sessions");
        0
    });
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        conversations,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceWebhook {
    pub call_sid: String,
    pub from: Option<String>,
}

/// Incoming call: greet and start gathering speech.
pub async fn voice(State(state): State<Arc<AppState>>, Form(form): Form<VoiceWebhook>) -> TwimlResult {
    let call_id = CallId::new(form.call_sid);
    info!(
        call_id = %call_id,
        from = form.from.as_deref().unwrap_or("unknown"),
        "incoming call"
    );

    if let Err(e) = state.store.get_or_create_session(&call_id).await {
        error!(call_id = %call_id, error = %e, "failed to open call session");
        return render(&Twiml::new().say(VOICE_FAILURE).hangup());
    }

    render(
        &Twiml::new()
            .say_with(&state.telephony.say_voice(), GREETING)
            .gather(gather(&state))
            .say(NO_INPUT)
            .hangup(),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechWebhook {
    pub call_sid: String,
    pub speech_result: Option<String>,
    pub confidence: Option<String>,
}

/// Recognized speech: reply, then keep listening.
pub async fn process_speech(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SpeechWebhook>,
) -> TwimlResult {
    let call_id = CallId::new(form.call_sid);
    info!(
        call_id = %call_id,
        speech = form.speech_result.as_deref().unwrap_or(""),
        confidence = form.confidence.as_deref().unwrap_or("none"),
        "speech result"
    );

    if !is_usable_speech(
        form.speech_result.as_deref(),
        form.confidence.as_deref(),
        state.telephony.min_confidence,
    ) {
        return render(
            &Twiml::new()
                .say(REPROMPT_TEXT)
                .gather(gather(&state))
                .say(GOODBYE)
                .hangup(),
        );
    }

    let utterance = form.speech_result.unwrap_or_default();
    let reply = state.pipeline.handle_utterance(&call_id, &utterance).await;

    render(
        &speak_reply(&state, Twiml::new(), &reply)
            .gather(gather(&state))
            .say(CLOSING)
            .hangup(),
    )
}

fn speak_reply(state: &AppState, twiml: Twiml, reply: &PipelineReply) -> Twiml {
    match &reply.audio {
        AudioResult::Synthesized(clip) => {
            info!(call_id = %reply.call_id, bytes = clip.len(), "playing synthesized reply");
            twiml.play(audio_data_url(&clip.content_type, &clip.bytes))
        }
        AudioResult::Failed { fallback_text, .. } => {
            info!(call_id = %reply.call_id, "synthesis unavailable, using carrier voice");
            twiml.say_with(&state.telephony.say_voice(), fallback_text.clone())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallStatusWebhook {
    pub call_sid: String,
    pub call_status: String,
}

/// Status callback: close the session once the call is over.
pub async fn call_status(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CallStatusWebhook>,
) -> Result<StatusCode, ApiError> {
    let call_id = CallId::new(form.call_sid);
    let status = form.call_status.to_ascii_lowercase();
    info!(call_id = %call_id, status = %status, "call status");

    if TERMINAL_CALL_STATUSES.contains(&status.as_str()) {
        if state.remove_on_hangup {
            state.store.remove_session(&call_id).await?;
        } else {
            state.store.end_session(&call_id).await?;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Legacy recording callback.
pub async fn process_voice() -> TwimlResult {
    render(&Twiml::new().say(RECORDING_RECEIVED).hangup())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptionWebhook {
    pub call_sid: String,
    pub transcription_text: Option<String>,
}

/// Legacy transcription callback.
pub async fn transcription(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TranscriptionWebhook>,
) -> StatusCode {
    let call_id = CallId::new(form.call_sid);
    match form.transcription_text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            let reply = state.pipeline.handle_utterance(&call_id, text).await;
            info!(call_id = %call_id, reply = %reply.text, "transcription handled");
        }
        _ => info!(call_id = %call_id, "empty transcription"),
    }
    StatusCode::OK
}

pub async fn conversation(
    State(state): State<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Result<Response, ApiError> {
    let summary = state
        .store
        .summarize(&CallId::new(call_sid))
        .await?
        .ok_or(ApiError::ConversationNotFound)?;
    Ok(Json(summary).into_response())
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::MissingField { field })
}

/// One-shot model call without session history.
pub async fn test_ai(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = required(body.message, "message")?;
    let config = state.pipeline.config();
    let request = LlmRequest::new(message.clone()).with_system(config.system_prompt.clone());
    let outcome = generate_reply(state.llm.as_ref(), &request, config.llm_timeout).await;
    Ok(Json(json!({ "input": message, "response": outcome.text() })))
}

pub async fn test_sentiment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = required(body.message, "message")?;
    let sentiment = analyze_sentiment(state.llm.as_ref(), &message).await;
    Ok(Json(json!({ "input": message, "sentiment": sentiment })))
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub text: Option<String>,
}

/// Synthesizes `text` and returns the raw audio.
pub async fn test_tts(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TextBody>,
) -> Result<Response, ApiError> {
    let text = required(body.text, "text")?;
    let config = state.pipeline.config();
    match synthesize_with_fallback(
        state.synthesizer.as_ref(),
        &text,
        &config.voices,
        config.synthesis_timeout,
    )
    .await
    {
        AudioResult::Synthesized(clip) => {
            Ok(([(header::CONTENT_TYPE, clip.content_type)], clip.bytes).into_response())
        }
        AudioResult::Failed {
            fallback_text,
            reason,
        } => Err(ApiError::Synthesis {
            fallback: fallback_text,
            details: reason,
        }),
    }
}

/// Reports whether the configured voice exists on the account.
pub async fn test_voice(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let voice_id = state.pipeline.config().voices.preferred.clone();
    let validation = match state.synthesizer.list_voices().await {
        Ok(voices) => match voices.into_iter().find(|v| v.id == voice_id) {
            Some(voice) => json!({ "valid": true, "name": voice.name }),
            None => json!({ "valid": false, "error": "voice not found" }),
        },
        Err(e) => {
            warn!(error = %e, "failed to list voices");
            json!({ "valid": false, "error": e.to_string() })
        }
    };
    Json(json!({ "current_voice_id": voice_id, "validation": validation }))
}

pub async fn voices(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let voices = state.synthesizer.list_voices().await.unwrap_or_else(|e| {
        warn!(error = %e, "failed to list voices");
        Vec::new()
    });
    Json(json!({ "voices": voices }))
}
