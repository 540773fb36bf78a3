//! Deep links into the single-page task views.
//!
//! `/task/<id>` and `/task_v1/<uuid>` have no file of their own; the page at
//! `/task/` (or `/task_v1/`) reads the id from the browser location.

use axum::{
    extract::Request,
    http::{uri::PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use std::sync::LazyLock;

static TASK_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/task/[0-9a-zA-Z-]{6,}$").expect("Invalid task link regex"));

static TASK_V1_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/task_v1/([0-9a-z]+-){4}[0-9a-z]+").expect("Invalid task_v1 link regex")
});

/// Point task deep links at their view before the static file service.
pub async fn rewrite_task_links(mut req: Request, next: Next) -> Response {
    if let Some(path) = task_view(req.uri().path()) {
        match with_path(req.uri(), path) {
            Ok(uri) => *req.uri_mut() = uri,
            Err(e) => tracing::debug!(error = %e, "Could not rewrite task link"),
        }
    }
    next.run(req).await
}

/// The view serving `path`, if it is a task deep link.
pub fn task_view(path: &str) -> Option<&'static str> {
    if TASK_V1_LINK.is_match(path) {
        Some("/task_v1/")
    } else if TASK_LINK.is_match(path) {
        Some("/task/")
    } else {
        None
    }
}

fn with_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}
