//! Per-call event recording.
//!
//! # Responsibilities
//! - Turn one completed API call into one `events` row
//! - Write it off the request path, under the store deadline
//!
//! # Design Decisions
//! - Fire and forget: a failed write is logged and counted, never surfaced
//! - No cancellation from the request into the write it triggered

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::model::EventRecord;
use crate::observability::metrics;
use crate::store::{with_deadline, DurableStore};

/// Writes [`EventRecord`]s to the durable store in the background.
#[derive(Clone)]
pub struct EventRecorder {
    store: Arc<dyn DurableStore>,
    timeout: Duration,
}

impl EventRecorder {
    pub fn new(store: Arc<dyn DurableStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Queue `event` for writing and return immediately.
    ///
    /// The handle is only useful to tests that want to wait for the write.
    pub fn record(&self, event: EventRecord) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let timeout = self.timeout;

        tokio::spawn(async move {
            match with_deadline(timeout, store.insert_event(&event)).await {
                Ok(()) => metrics::record_event_write(true),
                Err(e) => {
                    metrics::record_event_write(false);
                    tracing::warn!(
                        api_name = %event.api_name,
                        error = %e,
                        "Failed to record API event"
                    );
                }
            }
        })
    }

    /// Record how long boot took, as a `Util` event.
    pub fn record_startup(&self, caller_id: &str, latency: Duration) -> JoinHandle<()> {
        self.record(EventRecord {
            caller_id: caller_id.to_string(),
            api_name: "AppStartup".to_string(),
            api_type: "Util".to_string(),
            created_entity_id: None,
            response_bytes: None,
            latency,
        })
    }
}
