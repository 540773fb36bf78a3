//! Per-route middleware composition.
//!
//! Every API route is wrapped in the same fixed stack, outermost first:
//!
//! ```text
//! request_log → cache → event_log → session → metrics → json → handler
//! ```
//!
//! Each layer decides from the route's [`ApiRoute`] whether it applies, so
//! the stack shape never varies between routes.

use axum::middleware::from_fn_with_state;
use axum::routing::MethodRouter;
use tower::ServiceBuilder;

use super::middleware::{cache, event_log, json, metrics, request_log, session};
use super::server::AppState;

/// Category of an API call. Drives caching and appears in events and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiType {
    Util,
    Auth,
    Get,
    GetMany,
    Create,
    Put,
    Debug,
}

impl ApiType {
    /// Only pure reads are cached.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, ApiType::Get | ApiType::GetMany)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::Util => "Util",
            ApiType::Auth => "Auth",
            ApiType::Get => "Get",
            ApiType::GetMany => "GetMany",
            ApiType::Create => "Create",
            ApiType::Put => "Put",
            ApiType::Debug => "Debug",
        }
    }
}

/// Static description of one API route.
#[derive(Debug, Clone, Copy)]
pub struct ApiRoute {
    pub path: &'static str,
    pub name: &'static str,
    pub api_type: ApiType,
    pub requires_session: bool,
    pub enforce_json: bool,
}

impl ApiRoute {
    /// Authenticated route with JSON enforcement.
    pub const fn protected(path: &'static str, name: &'static str, api_type: ApiType) -> Self {
        Self {
            path,
            name,
            api_type,
            requires_session: true,
            enforce_json: true,
        }
    }

    /// Route reachable without a session.
    pub const fn public(path: &'static str, name: &'static str, api_type: ApiType) -> Self {
        Self {
            path,
            name,
            api_type,
            requires_session: false,
            enforce_json: true,
        }
    }

    /// Accept any request body media type (form posts).
    pub const fn accepting_forms(self) -> Self {
        Self {
            enforce_json: false,
            ..self
        }
    }
}

pub const ECHO: ApiRoute = ApiRoute::public("/api/echo", "Echo", ApiType::Util);
pub const LOGIN: ApiRoute = ApiRoute::public("/api/login", "Login", ApiType::Auth).accepting_forms();
pub const CHECK_SESSION: ApiRoute =
    ApiRoute::protected("/api/check_session", "CheckSession", ApiType::Auth);
pub const GET_CONFIG: ApiRoute = ApiRoute::protected("/api/get_config", "GetConfig", ApiType::Get);
pub const GET_TASKS: ApiRoute = ApiRoute::protected("/api/get_tasks", "GetTasks", ApiType::GetMany);
pub const GET_TASK: ApiRoute = ApiRoute::protected("/api/get_task", "GetTaskByID", ApiType::Get);
pub const CREATE_TASK: ApiRoute =
    ApiRoute::protected("/api/create_task", "CreateTask", ApiType::Create);
pub const PUT_TASK: ApiRoute = ApiRoute::protected("/api/put_task", "PutTask", ApiType::Put);

/// State handed to every layer of one route's stack.
#[derive(Clone)]
pub struct RouteContext {
    pub state: AppState,
    pub route: ApiRoute,
}

/// Wrap `handler` in the standard stack for `route`.
pub fn wrap(
    state: &AppState,
    route: ApiRoute,
    handler: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let ctx = RouteContext {
        state: state.clone(),
        route,
    };

    handler.layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(ctx.clone(), request_log::log_request))
            .layer(from_fn_with_state(ctx.clone(), cache::cache_response))
            .layer(from_fn_with_state(ctx.clone(), event_log::record_event))
            .layer(from_fn_with_state(ctx.clone(), session::require_session))
            .layer(from_fn_with_state(ctx.clone(), metrics::measure_handler))
            .layer(from_fn_with_state(ctx, json::enforce_json)),
    )
}
