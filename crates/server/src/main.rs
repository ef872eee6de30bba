use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use montage_core::{
    job::UpdateCallback, load_config, validate_config, AssetStager, ExternalEngine, FfmpegEngine,
    HttpAssetStager, InMemoryJobStore, JobPipeline, JobReport, JobStore,
};
use montage_server::{api::create_router, state::AppState};

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

    // Determine config path
    let config_path = std::env::var("MONTAGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(config_hash = &config_hash[..16], "Configuration loaded successfully");
    info!("Work directory: {:?}", config.jobs.work_dir);
    info!("Output directory: {:?}", config.jobs.output_dir);

    // Engine
    let ffmpeg = FfmpegEngine::new(config.engine.clone());
    match ffmpeg.validate().await {
        Ok(()) => match ffmpeg.capabilities().await {
            Ok(capabilities) => {
                let backends = capabilities.available_backends();
                info!(?backends, "FFmpeg available");
            }
            Err(e) => warn!("Could not list FFmpeg encoders: {}", e),
        },
        Err(e) => warn!("FFmpeg not usable, renders will fail: {}", e),
    }
    let engine: Arc<dyn ExternalEngine> = Arc::new(ffmpeg);

    // Asset staging
    let fetcher = Arc::new(
        HttpAssetStager::new(config.fetch.clone()).context("Failed to create asset stager")?,
    );
    let stager: Arc<dyn AssetStager> = fetcher.clone();

    // Job store and pipeline
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let on_update: UpdateCallback = Arc::new(|report: &JobReport| {
        debug!(
            job_id = %report.id,
            status = %report.status,
            progress = report.progress,
            "Job updated"
        );
    });
    let pipeline = JobPipeline::new(
        engine,
        stager,
        store,
        config.render.clone(),
        config.jobs.clone(),
    )
    .with_backend(config.engine.backend)
    .with_update_callback(on_update);

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), pipeline).with_fetcher(fetcher));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
