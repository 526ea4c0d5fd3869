use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use server::{app, config::ServerConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting voice reply server...");

    // Load configuration from environment, refusing to start on bad values
    let config = ServerConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {e}");
        anyhow::anyhow!("Invalid configuration: {e}")
    })?;
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, llm_timeout={}s, tts_backend={}, tts_concurrency={}",
        config.port,
        config.rate_limit_per_minute,
        config.llm_timeout_secs,
        config.tts_backend.name(),
        config.tts_concurrency
    );

    let state = AppState::from_config(&config)?;
    let app = app(state, &config)?;

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
