pub mod config;
pub mod error;
pub mod routes;
pub mod validation;

use std::{sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    extract::Request,
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use llm_core::{ChatCompleter, OpenAiClient, Persona};
use tower::{timeout::error::Elapsed, BoxError, ServiceBuilder};
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tts_core::{AudioStitcher, SpeechPipeline};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::routes::{chat_endpoint, health_check, not_found};

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatCompleter>,
    pub persona: Arc<Persona>,
    pub speech: Arc<SpeechPipeline>,
    pub llm_timeout: Duration,
}

impl AppState {
    /// Wire the real OpenAI and TTS clients described by `config`.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let chat = OpenAiClient::new(config.openai.clone())?;
        info!("LLM: OpenAI model {}", chat.model());

        let synth = config.tts_backend.build();
        info!(
            "TTS backend: {} (max {} chars per request, {:?} output)",
            synth.name(),
            synth.max_chars(),
            synth.format()
        );
        let stitcher = AudioStitcher::for_format_with_ffmpeg(synth.format(), &config.ffmpeg_path);
        info!("Audio stitching: {:?}", stitcher.strategy());
        let speech = SpeechPipeline::from_parts(synth, stitcher, config.voice.clone())
            .with_concurrency(config.tts_concurrency);

        Ok(Self {
            chat: Arc::new(chat),
            persona: Arc::new(config.persona.clone()),
            speech: Arc::new(speech),
            llm_timeout: config.llm_timeout(),
        })
    }
}

/// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = header.clone() {
        request.headers_mut().insert("x-request-id", value);
    }
    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Turn errors from the timeout layer into JSON responses.
async fn handle_middleware_error(err: BoxError, timeout_secs: u64) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::RequestTimeout(timeout_secs)
    } else {
        ApiError::InternalError(format!("Unhandled middleware error: {err}"))
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    match config.cors_allowed_origins {
        Some(ref allowed_origins) => {
            let origins: Vec<HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect();
            if origins.is_empty() {
                warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
                base.allow_origin(Any)
            } else {
                info!("CORS configured for {} origin(s)", origins.len());
                base.allow_origin(AllowOrigin::list(origins))
            }
        }
        None => {
            warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
            base.allow_origin(Any)
        }
    }
}

/// Build the HTTP application: routes at the root and under `/api`, plus the middleware stack.
pub fn app(state: AppState, config: &ServerConfig) -> anyhow::Result<Router> {
    // GlobalKeyExtractor: all requests share the same limit
    let replenish_ms = (60_000 / config.rate_limit_per_minute as u64).max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_ms)
            .burst_size(config.rate_limit_per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let request_timeout_secs = config.request_timeout_secs;
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(HandleErrorLayer::new(move |err: BoxError| {
            handle_middleware_error(err, request_timeout_secs)
        }))
        .timeout(config.request_timeout())
        .layer(cors_layer(config))
        .into_inner();

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/chat", post(chat_endpoint));

    Ok(Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state))
}
