//! Diagnostic endpoints.

use axum::{
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::http::response::{json_response, ApiError};

#[derive(Debug, Serialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
}

/// Reflect the request line and headers back as JSON.
pub async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> Result<Response, ApiError> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    json_response(
        &Echo {
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
        },
        None,
    )
}
