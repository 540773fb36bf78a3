//! Response cache layer.
//!
//! # Responsibilities
//! - Serve cacheable reads from [`ResponseCache`] and skip the handler on a hit
//! - Capture successful miss bodies and store them
//! - Tag every response with its [`CacheStatus`]
//!
//! # Design Decisions
//! - Only a 200 is ever stored; errors always recompute
//! - Only GET and HEAD on a cacheable route touch the cache
//! - The key is the request target (path and query), nothing else

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::cache::CacheStatus;
use crate::http::pipeline::RouteContext;
use crate::observability::metrics;

pub async fn cache_response(State(ctx): State<RouteContext>, req: Request, next: Next) -> Response {
    if !is_cacheable(&ctx, req.method()) {
        let response = next.run(req).await;
        return tagged(response, CacheStatus::Skipped);
    }

    let cache = &ctx.state.cache;
    let key = cache_key(req.uri());

    if let Some(body) = cache.get(&key) {
        tracing::debug!(key = %key, "Cache hit");
        let response = (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            body,
        )
            .into_response();
        return tagged(response, CacheStatus::Hit);
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return tagged(response, CacheStatus::Miss);
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to buffer response body");
            let response =
                (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong").into_response();
            return tagged(response, CacheStatus::Miss);
        }
    };

    cache.set(&key, bytes.clone(), Utc::now());
    tagged(Response::from_parts(parts, Body::from(bytes)), CacheStatus::Miss)
}

fn is_cacheable(ctx: &RouteContext, method: &Method) -> bool {
    ctx.route.api_type.is_cacheable() && (method == Method::GET || method == Method::HEAD)
}

/// Cache key for a request: its full target.
pub fn cache_key(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn tagged(mut response: Response, status: CacheStatus) -> Response {
    metrics::record_cache_lookup(status);
    response.extensions_mut().insert(status);
    response
}
