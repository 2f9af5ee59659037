//! pagemeta-api - HTTP API server for batch page metadata extraction

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagemeta_api::{build_router, AppConfig, AppState};
use pagemeta_db::{Database, UploadStore};
use pagemeta_jobs::{BatchHandler, BatchRunner, HttpExtractor, WorkerBuilder, WorkerConfig};

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "pagemeta_api=debug,...")
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "pagemeta_api=debug,pagemeta_jobs=debug,pagemeta_db=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("pagemeta-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            // No ANSI in files unless asked for
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _log_guard = init_tracing();

    let config = AppConfig::from_env();
    let worker_config = WorkerConfig::from_env();

    // Database
    let db = Database::connect_with_config(&config.database_url, config.pool_config()).await?;
    db.ensure_schema().await?;

    // Upload directory
    let uploads = UploadStore::new(config.upload_dir.clone());
    match uploads.validate().await {
        Ok(()) => info!(
            upload_dir = %config.upload_dir.display(),
            "Upload directory ready"
        ),
        Err(e) => warn!(
            upload_dir = %config.upload_dir.display(),
            error = %e,
            "Upload directory failed health check"
        ),
    }

    // Background worker
    let extractor = HttpExtractor::new(Duration::from_secs(config.fetch_timeout_secs))?;
    let runner = BatchRunner::new(Arc::new(extractor), db.records.clone());
    let worker = WorkerBuilder::new(db.clone())
        .with_config(worker_config)
        .with_handler(BatchHandler::new(runner))
        .build()?
        .start();

    let app = build_router(AppState::new(db.clone(), uploads), config.max_upload_bytes);

    // Start server
    let addr: SocketAddr = config.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop claiming work and let running batches finish before closing the pool.
    worker.shutdown().await?;
    db.close().await;
    info!("Server stopped");

    Ok(())
}
