use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediarelay_core::{
    load_config, load_config_or_default, validate_config, FfmpegStreamer, MetadataCache,
    MetadataProber, MetadataService, Transcoder, YtDlpProber,
};
use mediarelay_server::{api::create_router, state::AppState};

/// Config file used when `MEDIARELAY_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration. An explicitly named file must exist.
    let config = match std::env::var("MEDIARELAY_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        Err(_) => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            info!("Loading configuration from {:?} if present", path);
            load_config_or_default(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        ttl_secs = config.cache.ttl_secs,
        sweep_interval_secs = config.cache.sweep_interval_secs,
        "Metadata cache configured"
    );

    // Create external tool adapters
    let prober = Arc::new(YtDlpProber::new(config.prober.clone()));
    let transcoder = Arc::new(FfmpegStreamer::new(config.transcoder.clone()));

    // Missing tools only fail the requests that need them
    if let Err(e) = prober.validate().await {
        warn!("Prober '{}' is not usable: {}", prober.name(), e);
    }
    if let Err(e) = transcoder.validate().await {
        warn!("Transcoder '{}' is not usable: {}", transcoder.name(), e);
    }

    // Create metadata cache and start its sweeper
    let cache = MetadataCache::spawn(&config.cache);
    let metadata = MetadataService::new(cache, prober);

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), metadata, transcoder));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
