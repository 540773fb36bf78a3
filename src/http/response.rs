//! Response construction and error mapping.
//!
//! # Responsibilities
//! - Map handler failures to status codes with plain-text bodies
//! - Serialize JSON bodies and attach [`EventDetails`] for the event log
//!
//! # Design Decisions
//! - Store errors are logged here and rendered without detail
//! - Handler output travels up the stack in response extensions, never in an
//!   untyped bag

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::error::PersistenceError;

/// Handler output consumed by the event log layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDetails {
    pub created_entity_id: Option<String>,
    pub response_bytes: Option<usize>,
}

/// Failure of an API handler or middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::UnsupportedMediaType(m) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
            ApiError::Persistence(e) => {
                tracing::error!(error = %e, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "something went wrong".to_string(),
                )
            }
        };
        (status, message).into_response()
    }
}

/// Serialize `value` as a 200 JSON response.
pub fn json_response<T: Serialize>(
    value: &T,
    created_entity_id: Option<String>,
) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value).map_err(|e| {
        tracing::error!(error = %e, "JSON serialization failed");
        ApiError::Internal("something went wrong".to_string())
    })?;

    let details = EventDetails {
        created_entity_id,
        response_bytes: Some(body.len()),
    };

    let mut response = (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response();
    response.extensions_mut().insert(details);
    Ok(response)
}
