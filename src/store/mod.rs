//! Durable store subsystem.
//!
//! # Data Flow
//! ```text
//! login handler        → persist_new_session (blocking the request, with deadline)
//! session flusher      → batch_persist_last_accessed (detached, all-or-nothing)
//! event log middleware → insert_event (detached, best effort)
//! task handlers        → list/get/create/update tasks
//! ```
//!
//! # Design Decisions
//! - The core only sees the [`DurableStore`] trait; the engine is pluggable
//! - Deadlines are applied by callers through [`with_deadline`]
//! - SQLite runs on the blocking pool behind a connection mutex

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{StoreBackend, StoreConfig};
use crate::error::PersistenceError;
use crate::model::{EventRecord, NewTask, Task, TaskUpdate};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Operations the server needs from durable storage.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist a freshly created session and return its record id.
    async fn persist_new_session(
        &self,
        caller_id: &str,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String, PersistenceError>;

    /// Apply every last-accessed update in a single transaction.
    ///
    /// Either all updates land or none do.
    async fn batch_persist_last_accessed(
        &self,
        updates: &HashMap<String, DateTime<Utc>>,
    ) -> Result<(), PersistenceError>;

    async fn insert_event(&self, event: &EventRecord) -> Result<(), PersistenceError>;

    /// Server-side key/value configuration. Integer-looking values are numbers.
    async fn get_config(&self) -> Result<BTreeMap<String, serde_json::Value>, PersistenceError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError>;

    async fn get_task(&self, id: &str) -> Result<Option<Task>, PersistenceError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, PersistenceError>;

    /// Returns `None` if no task has `update.id`.
    async fn update_task(&self, update: TaskUpdate) -> Result<Option<Task>, PersistenceError>;

    async fn ping(&self) -> Result<(), PersistenceError>;
}

/// Run a store operation, failing with [`PersistenceError::Timeout`] once
/// `deadline` passes.
pub async fn with_deadline<T, F>(deadline: Duration, op: F) -> Result<T, PersistenceError>
where
    F: Future<Output = Result<T, PersistenceError>>,
{
    match tokio::time::timeout(deadline, op).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::Timeout(deadline)),
    }
}

/// Open the backend selected in configuration.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn DurableStore>, PersistenceError> {
    match config.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.path)?;
            tracing::info!(path = %config.path.display(), "Opened SQLite store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Interpret a stored config value the way clients expect it.
pub(crate) fn config_value(raw: &str) -> serde_json::Value {
    match raw.parse::<i64>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<(), _> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(PersistenceError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_config_value_numbers_and_strings() {
        assert_eq!(config_value("14"), serde_json::json!(14));
        assert_eq!(config_value("dark"), serde_json::json!("dark"));
    }
}
