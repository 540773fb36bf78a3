//! Event recording layer.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::http::pipeline::RouteContext;
use crate::http::response::EventDetails;
use crate::model::EventRecord;

/// Time the rest of the stack and record one event for the call.
///
/// Runs inside the cache layer, so cache hits produce no event.
pub async fn record_event(State(ctx): State<RouteContext>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(req).await;
    let latency = start.elapsed();

    let details = response
        .extensions()
        .get::<EventDetails>()
        .cloned()
        .unwrap_or_default();

    ctx.state.events.record(EventRecord {
        caller_id: ctx.state.config.auth.caller_id.clone(),
        api_name: ctx.route.name.to_string(),
        api_type: ctx.route.api_type.as_str().to_string(),
        created_entity_id: details.created_entity_id,
        response_bytes: details.response_bytes,
        latency,
    });

    response
}
