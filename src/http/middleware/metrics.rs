//! Per-API call count and handler latency.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::http::pipeline::RouteContext;
use crate::observability::metrics;

/// Sits directly above the handler so latency excludes the other layers.
pub async fn measure_handler(
    State(ctx): State<RouteContext>,
    req: Request,
    next: Next,
) -> Response {
    let name = ctx.route.name;
    let api_type = ctx.route.api_type.as_str();
    metrics::record_api_call(name, api_type);

    let start = Instant::now();
    let response = next.run(req).await;
    metrics::record_api_latency(name, api_type, start.elapsed());

    response
}
