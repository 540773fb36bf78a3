//! Non-production diagnostics for the in-memory state.
//!
//! Mounted only when `debug.session_apis` is set. The routes go through the
//! standard pipeline without a session check, so they still work after the
//! session map has been cleared.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::debug_auth_middleware;
use self::handlers::*;
use crate::http::pipeline::{wrap, ApiRoute, ApiType};
use crate::http::server::AppState;

pub const GET_SESSIONS: ApiRoute = ApiRoute::public("/api/get_sessions", "GetSessions", ApiType::Debug);
pub const CLEAR_SESSIONS: ApiRoute =
    ApiRoute::public("/api/clear_sessions", "ClearSessions", ApiType::Debug);
pub const CLEAR_CACHE: ApiRoute = ApiRoute::public("/api/clear_cache", "ClearCache", ApiType::Debug);

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(GET_SESSIONS.path, wrap(state, GET_SESSIONS, get(get_sessions)))
        .route(
            CLEAR_SESSIONS.path,
            wrap(state, CLEAR_SESSIONS, post(clear_sessions)),
        )
        .route(CLEAR_CACHE.path, wrap(state, CLEAR_CACHE, post(clear_cache)))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            debug_auth_middleware,
        ))
}
