//! # Meridian POS Server
//!
//! HTTP API over the transaction & inventory ledger engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Meridian POS Server                              │
//! │                                                                         │
//! │  Terminals ───► axum (HTTP) ───► meridian-engine ───► SQLite (branch)   │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                            external payment gateway                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use meridian_db::{Database, DbConfig};
use meridian_engine::Engine;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub engine: Engine,
}

/// Handlers receive the state behind an Arc.
pub type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG controls verbosity.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("Starting Meridian POS server...");

    // Load configuration
    let config = AppConfig::load()?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        gateway_mode = ?config.gateway_mode,
        "Configuration loaded"
    );

    // Connect to the branch database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    // Wire the engine with the frozen configuration
    let engine = Engine::new(db.clone(), config.engine_config())?;

    let state: SharedState = Arc::new(AppState { db, engine });
    let app = routes::router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
