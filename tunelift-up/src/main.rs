//! tunelift-up - Upload Wizard Service
//!
//! Drives the multi-step release upload flow for the Tunelift dashboard:
//! cover upload, type selection, metadata entry, per-track audio upload
//! with metadata extraction, and review submission, with drafts mirrored
//! to durable storage for resumability.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tunelift_common::events::EventBus;

use tunelift_up::config::ServiceConfig;
use tunelift_up::db::{self, SqliteDraftRepository};
use tunelift_up::services::{HttpReleaseGateway, HttpUploadClient};
use tunelift_up::AppState;

/// Command-line arguments for tunelift-up
#[derive(Parser, Debug)]
#[command(name = "tunelift-up")]
#[command(about = "Upload Wizard service for Tunelift")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TUNELIFT_UP_PORT")]
    port: Option<u16>,

    /// Data directory holding the drafts database
    #[arg(short, long, env = "TUNELIFT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, env = "TUNELIFT_UP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunelift_up=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting tunelift-up (Upload Wizard) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let data_dir =
        tunelift_common::config::resolve_data_dir(args.data_dir.as_deref(), "TUNELIFT_DATA_DIR")
            .context("Failed to resolve data directory")?;
    std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    let config = ServiceConfig::load(data_dir, args.config.as_deref(), args.port)
        .context("Failed to load configuration")?;
    info!("Storage backend: {}", config.storage_base_url);
    info!("Release gateway: {}", config.gateway_base_url);

    // Database connection pool
    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = db::init_database_pool(&db_path).await?;

    // Drop stored drafts that already finished; nothing left to resume
    let repo = SqliteDraftRepository::new(db_pool.clone());
    let swept = repo.sweep_terminal().await?;
    if swept > 0 {
        info!(swept = swept, "Removed terminal drafts from storage");
    }

    // Event bus for SSE broadcasting
    let events = EventBus::new(100);

    // Outbound service clients
    let uploader = HttpUploadClient::new(
        config.storage_base_url.clone(),
        config.limits.clone(),
        config.request_timeout_secs,
    )
    .map_err(|e| anyhow::anyhow!("Failed to build upload client: {}", e))?;
    let gateway =
        HttpReleaseGateway::new(config.gateway_base_url.clone(), config.request_timeout_secs)
            .map_err(|e| anyhow::anyhow!("Failed to build gateway client: {}", e))?;

    let port = config.port;
    let state = AppState::new(
        db_pool,
        events,
        Arc::new(uploader),
        Arc::new(gateway),
        Arc::new(repo),
        config,
    );

    let app = tunelift_up::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
