//! Entities persisted through the durable store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Task statuses accepted by the board.
pub const TASK_STATUSES: &[&str] = &["BACKLOG", "DOING", "DONE", "DEPRIORITIZED", "ARCHIVE"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub story_id: Option<String>,
    pub edited: bool,
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub story_id: Option<String>,
}

/// Full replacement of a task's editable fields.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskUpdate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub story_id: Option<String>,
}

fn default_status() -> String {
    "BACKLOG".to_string()
}

/// Returns true if `status` is one of [`TASK_STATUSES`].
pub fn is_known_status(status: &str) -> bool {
    TASK_STATUSES.contains(&status)
}

/// One completed API call, as written to the `events` table.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub caller_id: String,
    pub api_name: String,
    pub api_type: String,
    pub created_entity_id: Option<String>,
    pub response_bytes: Option<usize>,
    #[serde(with = "latency_millis")]
    pub latency: Duration,
}

mod latency_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(latency.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task: NewTask = serde_json::from_str(r#"{"title":"write tests"}"#).unwrap();
        assert_eq!(task.status, "BACKLOG");
        assert!(task.description.is_empty());
        assert!(task.story_id.is_none());
    }

    #[test]
    fn test_known_statuses() {
        assert!(is_known_status("DOING"));
        assert!(!is_known_status("doing"));
        assert!(!is_known_status("BLOCKED"));
    }
}
