//! SQLite-backed durable store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::{config_value, DurableStore};
use crate::error::PersistenceError;
use crate::model::{EventRecord, NewTask, Task, TaskUpdate};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    caller_id TEXT NOT NULL,
    session_id TEXT NOT NULL UNIQUE,
    session_created_at TEXT NOT NULL,
    session_last_accessed TEXT NOT NULL,
    edited INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    caller_id TEXT NOT NULL,
    action TEXT NOT NULL,
    action_type TEXT NOT NULL,
    create_entity_id TEXT,
    get_response_bytes INTEGER,
    latency_ms INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    story_id TEXT,
    edited INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL
);
";

const TASK_COLUMNS: &str = "id, created_at, updated_at, title, description, status, story_id, edited";

/// Thin repository over SQLite.
///
/// Thread-safe via an internal `Mutex<Connection>`; every call runs on the
/// blocking pool so request tasks never block a runtime worker.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| PersistenceError::Task(e.to_string()))?
        .map_err(PersistenceError::from)
    }

    /// Insert or replace a config row.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO config (created_at, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![Utc::now().to_rfc3339(), key, value],
            )
            .map(|_| ())
        })
        .await
    }

    /// Persisted last-accessed time for a session token.
    pub async fn session_last_accessed(
        &self,
        token: &str,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT session_last_accessed FROM sessions WHERE session_id = ?1",
                params![token],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|raw| raw.map(|s| parse_dt(&s)))
        })
        .await
    }
}

fn parse_dt(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        created_at: parse_dt(&row.get::<_, String>(1)?),
        updated_at: parse_dt(&row.get::<_, String>(2)?),
        title: row.get(3)?,
        description: row.get(4)?,
        status: row.get(5)?,
        story_id: row.get(6)?,
        edited: row.get::<_, i64>(7)? != 0,
    })
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn persist_new_session(
        &self,
        caller_id: &str,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String, PersistenceError> {
        let caller_id = caller_id.to_string();
        let token = token.to_string();
        self.with_conn(move |conn| {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now().to_rfc3339();
            let created = created_at.to_rfc3339();
            conn.execute(
                "INSERT INTO sessions (id, created_at, updated_at, caller_id, session_id,
                                       session_created_at, session_last_accessed)
                 VALUES (?1, ?2, ?2, ?3, ?4, ?5, ?5)",
                params![id, now, caller_id, token, created],
            )?;
            Ok(id)
        })
        .await
    }

    async fn batch_persist_last_accessed(
        &self,
        updates: &HashMap<String, DateTime<Utc>>,
    ) -> Result<(), PersistenceError> {
        if updates.is_empty() {
            return Ok(());
        }
        let updates: Vec<(String, String)> = updates
            .iter()
            .map(|(token, at)| (token.clone(), at.to_rfc3339()))
            .collect();
        self.with_conn(move |conn| {
            // Dropping the transaction without commit rolls back.
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "UPDATE sessions SET updated_at = ?1, session_last_accessed = ?2, edited = 1
                     WHERE session_id = ?3",
                )?;
                let now = Utc::now().to_rfc3339();
                for (token, at) in &updates {
                    stmt.execute(params![now, at, token])?;
                }
            }
            tx.commit()
        })
        .await
    }

    async fn insert_event(&self, event: &EventRecord) -> Result<(), PersistenceError> {
        let event = event.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO events (created_at, caller_id, action, action_type,
                                     create_entity_id, get_response_bytes, latency_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    Utc::now().to_rfc3339(),
                    event.caller_id,
                    event.api_name,
                    event.api_type,
                    event.created_entity_id,
                    event.response_bytes.map(|n| n as i64),
                    event.latency.as_millis() as i64,
                ],
            )
            .map(|_| ())
        })
        .await
    }

    async fn get_config(&self) -> Result<BTreeMap<String, serde_json::Value>, PersistenceError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM config")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut config = BTreeMap::new();
            for row in rows {
                let (key, value) = row?;
                config.insert(key, config_value(&value));
            }
            Ok(config)
        })
        .await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at"))?;
            let tasks = stmt
                .query_map([], task_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
        .await
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, PersistenceError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()
        })
        .await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, PersistenceError> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            let created = Task {
                id: Uuid::new_v4().to_string(),
                created_at: now,
                updated_at: now,
                title: task.title,
                description: task.description,
                status: task.status,
                story_id: task.story_id,
                edited: false,
            };
            conn.execute(
                &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?2, ?3, ?4, ?5, ?6, 0)"),
                params![
                    created.id,
                    now.to_rfc3339(),
                    created.title,
                    created.description,
                    created.status,
                    created.story_id,
                ],
            )?;
            Ok(created)
        })
        .await
    }

    async fn update_task(&self, update: TaskUpdate) -> Result<Option<Task>, PersistenceError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET updated_at = ?1, title = ?2, description = ?3, status = ?4,
                                  story_id = ?5, edited = 1
                 WHERE id = ?6",
                params![
                    Utc::now().to_rfc3339(),
                    update.title,
                    update.description,
                    update.status,
                    update.story_id,
                    update.id,
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![update.id],
                task_from_row,
            )
            .optional()
        })
        .await
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        self.with_conn(|conn| conn.query_row("SELECT 1", [], |_| Ok(()))).await
    }
}
