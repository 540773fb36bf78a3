//! Server-side key/value configuration for the front end.

use axum::{extract::State, response::Response};

use crate::http::response::{json_response, ApiError};
use crate::http::server::AppState;
use crate::store::with_deadline;

pub async fn get_config(State(state): State<AppState>) -> Result<Response, ApiError> {
    let values = with_deadline(state.store_timeout(), state.store.get_config()).await?;
    json_response(&values, None)
}
