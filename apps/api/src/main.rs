//! # SicargaBox API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SicargaBox API Server                            │
//! │                                                                         │
//! │  Browser ───► HTTP (8000) ───► axum handlers ───► SQLite               │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │                              media/facturas/                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sicarga_api::config::ApiConfig;
use sicarga_api::{build_router, AppState};
use sicarga_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration first: its log_level is the fallback filter
    let config = ApiConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    info!("Starting SicargaBox API server...");
    info!(
        bind = %config.bind_address(),
        database = %config.database_path.display(),
        media = %config.media_dir.display(),
        "Configuration loaded"
    );

    // Open database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("Failed to open database")?;

    // Startup housekeeping
    let purged = db.users().purge_expired_tokens().await?;
    let expired = db.quotes().expire_stale().await?;
    info!(purged_tokens = purged, expired_quotes = expired, "Startup housekeeping complete");

    tokio::fs::create_dir_all(&config.media_dir)
        .await
        .with_context(|| format!("Cannot create media dir {}", config.media_dir.display()))?;

    let bind_address = config.bind_address();
    let state = Arc::new(AppState::new(db, config));
    let app = build_router(state.clone());

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!(addr = %bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db.close().await;
    info!("SicargaBox API stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }

    info!("Stop requested, draining in-flight requests");
}
