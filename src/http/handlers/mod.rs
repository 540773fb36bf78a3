//! API handlers.
//!
//! Handlers return `Result<Response, ApiError>` and build bodies with
//! [`json_response`](crate::http::response::json_response) so the event log
//! sees the byte count.

pub mod auth;
pub mod server_config;
pub mod tasks;
pub mod util;
