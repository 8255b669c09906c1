use std::{net::SocketAddr, sync::Arc};

use llm_core::{CompletionAdapter, LlmClient, LlmConfig};
use tokio::net::TcpListener;
use tracing::info;
use tts_core::{OpenAiSpeechClient, SpeechConfig, SynthesisStreamer};

use server::metrics::RelayMetrics;
use server::validation::validate_server_config;
use server::{build_router, AppState, ServerConfig, SessionEngine};

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
    info!("Starting relay server...");

    // Load configuration from environment
    let config = ServerConfig::from_env();
    validate_server_config(&config)?;
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, chunk_size={}, \
         chunk_delay={}ms, framing={:?}",
        config.port,
        config.rate_limit_per_minute,
        config.chunk_size,
        config.chunk_delay_ms,
        config.framing
    );

    let llm_config = LlmConfig::from_env();
    info!(
        "LLM provider {:?}, model {}",
        llm_config.provider, llm_config.model
    );
    let llm = LlmClient::new(llm_config)?;
    let completion =
        CompletionAdapter::new(Arc::new(llm)).with_timeout(config.upstream_timeout());

    let speech_config = SpeechConfig::from_env();
    info!(
        "TTS model {}, voice {}, format {}",
        speech_config.model, speech_config.voice, speech_config.format
    );
    let speech = OpenAiSpeechClient::new(speech_config)?;
    let streamer = SynthesisStreamer::new(Arc::new(speech), config.stream_settings());

    let metrics = Arc::new(RelayMetrics::new());
    let engine = SessionEngine::new(
        completion,
        streamer,
        config.session_options(),
        metrics.clone(),
    );

    let port = config.port;
    let app = build_router(AppState {
        engine: Arc::new(engine),
        metrics,
        config,
    })?;

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on ws://{addr}/ws");
    axum::serve(listener, app).await?;
    Ok(())
}
