//! OCR Forge Server
//!
//! Searchable-PDF conversion service: authenticated uploads, per-plan page
//! quotas, ocrmypdf-backed conversion, and a payment-provider upgrade flow.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_forge::billing::PaddleCheckout;
use ocr_forge::config::Config;
use ocr_forge::db;
use ocr_forge::ocr::OcrMyPdfEngine;
use ocr_forge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocr_forge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting OCR Forge v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload dir: {}", config.storage.upload_dir.display());
    tracing::info!("Download dir: {}", config.storage.download_dir.display());

    // Storage roots must exist before the first upload
    tokio::fs::create_dir_all(&config.storage.upload_dir)
        .await
        .context("failed to create upload directory")?;
    tokio::fs::create_dir_all(&config.storage.download_dir)
        .await
        .context("failed to create download directory")?;

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .context("failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database.url);

    // External collaborators
    let ocr_engine = Arc::new(OcrMyPdfEngine::new(&config.ocr.binary));
    let billing = Arc::new(PaddleCheckout::new(&config.billing));

    // Create application state and router
    let state = AppState::new(config.clone(), db_pool, ocr_engine, billing);
    let app = ocr_forge::app(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("OCR Forge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
