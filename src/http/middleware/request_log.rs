//! Access logging for API calls.

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use std::time::Instant;

use crate::cache::CacheStatus;
use crate::http::pipeline::RouteContext;
use crate::http::request::RequestIdExt;
use crate::observability::metrics;

/// Log one line per API call once the response is ready.
pub async fn log_request(State(ctx): State<RouteContext>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let request_id = req.request_id().to_string();

    let response = next.run(req).await;

    let status = response.status();
    let cache = response
        .extensions()
        .get::<CacheStatus>()
        .copied()
        .unwrap_or(CacheStatus::Skipped);

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        api_name = ctx.route.name,
        status = status.as_u16(),
        cache = %cache,
        latency_ms = start.elapsed().as_millis() as u64,
        "API request"
    );
    metrics::record_request(method.as_str(), status.as_u16());

    response
}
