//! Process-local store for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::{config_value, DurableStore};
use crate::error::PersistenceError;
use crate::model::{EventRecord, NewTask, Task, TaskUpdate};

/// Row mirrored from the `sessions` table.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub record_id: String,
    pub caller_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, StoredSession>,
    events: Vec<EventRecord>,
    tasks: Vec<Task>,
    config: BTreeMap<String, String>,
}

/// In-memory implementation of [`DurableStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a config row.
    pub fn set_config(&self, key: &str, value: &str) {
        self.tables.lock().config.insert(key.to_string(), value.to_string());
    }

    /// Persisted view of a session, keyed by token.
    pub fn stored_session(&self, token: &str) -> Option<StoredSession> {
        self.tables.lock().sessions.get(token).cloned()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.tables.lock().events.clone()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn persist_new_session(
        &self,
        caller_id: &str,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String, PersistenceError> {
        let record_id = Uuid::new_v4().to_string();
        self.tables.lock().sessions.insert(
            token.to_string(),
            StoredSession {
                record_id: record_id.clone(),
                caller_id: caller_id.to_string(),
                token: token.to_string(),
                created_at,
                last_accessed_at: created_at,
            },
        );
        Ok(record_id)
    }

    async fn batch_persist_last_accessed(
        &self,
        updates: &HashMap<String, DateTime<Utc>>,
    ) -> Result<(), PersistenceError> {
        let mut tables = self.tables.lock();
        // Same semantics as the SQL UPDATE: unknown tokens are a no-op.
        for (token, at) in updates {
            if let Some(session) = tables.sessions.get_mut(token) {
                session.last_accessed_at = *at;
            }
        }
        Ok(())
    }

    async fn insert_event(&self, event: &EventRecord) -> Result<(), PersistenceError> {
        self.tables.lock().events.push(event.clone());
        Ok(())
    }

    async fn get_config(&self) -> Result<BTreeMap<String, serde_json::Value>, PersistenceError> {
        Ok(self
            .tables
            .lock()
            .config
            .iter()
            .map(|(k, v)| (k.clone(), config_value(v)))
            .collect())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        Ok(self.tables.lock().tasks.clone())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, PersistenceError> {
        Ok(self.tables.lock().tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, PersistenceError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            title: task.title,
            description: task.description,
            status: task.status,
            story_id: task.story_id,
            edited: false,
        };
        self.tables.lock().tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, update: TaskUpdate) -> Result<Option<Task>, PersistenceError> {
        let mut tables = self.tables.lock();
        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == update.id) else {
            return Ok(None);
        };
        task.title = update.title;
        task.description = update.description;
        task.status = update.status;
        task.story_id = update.story_id;
        task.updated_at = Utc::now();
        task.edited = true;
        Ok(Some(task.clone()))
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
