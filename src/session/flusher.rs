//! Background flush of pending last-accessed updates.
//!
//! # Responsibilities
//! - Periodically swap out the pending batch and persist it
//! - Sweep expired sessions from memory on the same cadence
//! - Stop promptly when the owning registry shuts down

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::registry::Shared;

/// Handle to the running flush task, owned by the registry.
pub(crate) struct Flusher {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Flusher {
    pub(crate) fn spawn(shared: Arc<Shared>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(shared, interval, stop_rx));
        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Signal the loop to exit and wait for it.
    pub(crate) async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Session flusher task ended abnormally");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(shared: Arc<Shared>, interval: Duration, mut stop: oneshot::Receiver<()>) {
    tracing::info!(interval_secs = interval.as_secs(), "Session flusher starting");

    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                shared.evict_expired(chrono::Utc::now());
                let batch = shared.take_pending();
                if batch.is_empty() {
                    continue;
                }
                // The write is decoupled from the ticker; a slow store never
                // delays the next swap.
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = shared.persist_batch(batch).await;
                });
            }
            _ = &mut stop => {
                tracing::info!("Session flusher received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
