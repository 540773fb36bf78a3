//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (metrics exporter, session flusher, signals)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;

use super::shutdown::Shutdown;
use super::signals::spawn_signal_handler;
use crate::config::{ConfigError, ServerConfig};
use crate::error::PersistenceError;
use crate::http::{AppState, HttpServer};
use crate::observability::metrics;
use crate::store::{self, with_deadline};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(String),

    #[error("durable store unavailable: {0}")]
    Store(#[from] PersistenceError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Open and check the store, then build the shared state.
pub async fn initialize(config: ServerConfig) -> Result<AppState, StartupError> {
    let store = store::open(&config.store)?;
    with_deadline(config.store.timeout(), store.ping()).await?;
    tracing::info!(backend = ?config.store.backend, "Durable store reachable");

    Ok(AppState::new(config, store))
}

/// Run the server until a termination signal, then shut down in order.
///
/// Expects logging to be initialized already.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let started = Instant::now();

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let bind_address = config.listener.bind_address.clone();
    let state = initialize(config).await?;
    let server = HttpServer::new(state.clone());

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    let _signals = spawn_signal_handler(Arc::clone(&shutdown));

    state
        .events
        .record_startup(&state.config.auth.caller_id, started.elapsed());
    tracing::info!(
        address = %bind_address,
        startup_ms = started.elapsed().as_millis() as u64,
        "Startup complete"
    );

    server.run(listener, receiver).await.map_err(StartupError::Serve)?;
    tracing::info!("Shutdown complete");
    Ok(())
}
