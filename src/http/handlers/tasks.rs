//! Task endpoints.

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Response,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::http::response::{json_response, ApiError};
use crate::http::server::AppState;
use crate::model::{is_known_status, NewTask, TaskUpdate};
use crate::store::with_deadline;

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub id: Option<String>,
}

pub async fn get_tasks(State(state): State<AppState>) -> Result<Response, ApiError> {
    let tasks = with_deadline(state.store_timeout(), state.store.list_tasks()).await?;
    json_response(&tasks, None)
}

pub async fn get_task(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<Response, ApiError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing id".to_string()))?;

    let task = with_deadline(state.store_timeout(), state.store.get_task(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;
    json_response(&task, None)
}

pub async fn create_task(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let new_task: NewTask = decode(&body)?;
    if new_task.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    check_status(&new_task.status)?;

    let task = with_deadline(state.store_timeout(), state.store.create_task(new_task)).await?;
    tracing::info!(task_id = %task.id, "Task created");
    let id = task.id.clone();
    json_response(&task, Some(id))
}

pub async fn put_task(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let update: TaskUpdate = decode(&body)?;
    check_status(&update.status)?;

    let task = with_deadline(state.store_timeout(), state.store.update_task(update))
        .await?
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))?;
    json_response(&task, None)
}

// Bodies are decoded by hand so that a missing Content-Type is accepted.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::info!(error = %e, "unable to decode json");
        ApiError::BadRequest("invalid request body".to_string())
    })
}

fn check_status(status: &str) -> Result<(), ApiError> {
    if is_known_status(status) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("unknown status: {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_and_status() {
        let task: NewTask = decode(br#"{"title":"write docs"}"#).unwrap();
        assert_eq!(task.status, "BACKLOG");
        assert!(decode::<NewTask>(b"{").is_err());
        assert!(check_status("DOING").is_ok());
        assert!(check_status("WHENEVER").is_err());
    }
}
