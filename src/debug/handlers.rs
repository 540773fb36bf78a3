use axum::{extract::State, response::Response};

use crate::http::response::{json_response, ApiError};
use crate::http::server::AppState;

pub async fn get_sessions(State(state): State<AppState>) -> Result<Response, ApiError> {
    json_response(&state.sessions.list_all(), None)
}

pub async fn clear_sessions(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.sessions.clear_all();
    json_response(&serde_json::json!({ "message": "ok" }), None)
}

pub async fn clear_cache(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.cache.clear();
    json_response(&serde_json::json!({ "message": "ok" }), None)
}
