use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM error: {0:#}")]
    LlmError(anyhow::Error),

    #[error("LLM request timed out after {0} seconds")]
    LlmTimeout(u64),

    #[error("TTS error: {0}")]
    TtsError(#[from] tts_core::TtsError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timed out after {0} seconds")]
    RequestTimeout(u64),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::LlmError(e) => {
                tracing::error!("LLM error: {e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("LLM error: {e:#}"))
            }
            ApiError::LlmTimeout(secs) => {
                tracing::error!("LLM request timed out after {secs} seconds");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("Request timed out after {secs} seconds. Please try again with a shorter message."),
                )
            }
            ApiError::TtsError(e) => {
                tracing::error!("TTS error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("TTS error: {e}"))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::RequestTimeout(secs) => {
                tracing::error!("Request timed out after {secs} seconds");
                (
                    StatusCode::REQUEST_TIMEOUT,
                    format!("Request timed out after {secs} seconds"),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
