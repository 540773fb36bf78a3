//! Task tracker server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ router-wide layers (request id, trace, limits, timeout)
//!                        │
//!          ┌─────────────┴──────────────┐
//!          ▼                            ▼
//!      /api/* route                 static pages
//!          │                            │
//!     request log                  session check ──▶ redirect to /login
//!     cache ───────── hit ─▶ cached body
//!     event log ──────────────▶ EventRecorder ──▶ store (detached)
//!     session ──── 401 ──▶ "invalid cookie"
//!     metrics
//!     json check
//!     handler ────────────────▶ DurableStore
//!
//!     SessionRegistry ── flusher tick ──▶ batched last-accessed write
//! ```

use clap::Parser;
use std::path::PathBuf;

use tracker_server::config;
use tracker_server::lifecycle;
use tracker_server::observability::logging;

#[derive(Parser)]
#[command(name = "tracker-server", version, about = "Task tracker HTTP backend")]
struct Args {
    /// TOML configuration file. Environment variables override it.
    #[arg(short, long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        store = ?config.store.backend,
        dev_mode = config.server.dev_mode,
        "tracker-server starting"
    );

    lifecycle::run(config).await?;
    Ok(())
}
