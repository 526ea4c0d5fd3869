use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::Uri,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::validation::validate_chat_request;
use crate::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    text: String,
    audio_base64: String,
    audio_format: &'static str,
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

pub async fn chat_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let message = validate_chat_request(&req.message)?;

    info!("Chat request received: message length={}", message.len());
    let start_time = Instant::now();

    let reply = tokio::time::timeout(
        state.llm_timeout,
        state.chat.complete(state.persona.prompt(), message),
    )
    .await
    .map_err(|_| ApiError::LlmTimeout(state.llm_timeout.as_secs()))?
    .map_err(ApiError::LlmError)?;

    let llm_time = start_time.elapsed();
    info!(
        "LLM response received in {:.2}s, reply length={}",
        llm_time.as_secs_f64(),
        reply.len()
    );

    let speech = state.speech.speak(&reply).await?;
    info!(
        "TTS audio generated with {} in {:.2}s: {} of {} chunks, {} bytes{}",
        state.speech.backend_name(),
        (start_time.elapsed() - llm_time).as_secs_f64(),
        speech.segment_count,
        speech.chunk_count,
        speech.audio.len(),
        if speech.degraded { " (plain concatenation)" } else { "" }
    );

    Ok(Json(ChatResponse {
        audio_base64: speech.to_base64(),
        audio_format: speech.format.mime_type(),
        text: reply,
    }))
}
