//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every API route and the page fallback
//! - Wire up router-wide middleware (request id, tracing, timeout, body limit)
//! - Serve until shutdown, then flush the session registry

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    response::Redirect,
    routing::{any, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::cache::ResponseCache;
use crate::config::ServerConfig;
use crate::debug;
use crate::eventlog::EventRecorder;
use crate::http::handlers::{auth, server_config, tasks, util};
use crate::http::middleware::pages::rewrite_task_links;
use crate::http::middleware::session::require_page_session;
use crate::http::pipeline::{self, wrap};
use crate::http::request::{propagate_request_id, set_request_id, RequestIdExt};
use crate::session::{SessionRegistry, SessionSettings};
use crate::store::DurableStore;

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<SessionRegistry>,
    pub cache: ResponseCache,
    pub events: EventRecorder,
    pub store: Arc<dyn DurableStore>,
}

impl AppState {
    /// Build the shared state. Starts the session flusher, so this must run
    /// inside a tokio runtime.
    pub fn new(config: ServerConfig, store: Arc<dyn DurableStore>) -> Self {
        let store_timeout = config.store.timeout();
        let sessions = SessionRegistry::start(
            Arc::clone(&store),
            SessionSettings::from_config(&config.session, store_timeout),
        );
        let cache = ResponseCache::new(config.cache.effective_ttl(config.server.dev_mode));
        let events = EventRecorder::new(Arc::clone(&store), store_timeout);

        tracing::info!(
            cache_ttl_secs = cache.ttl().as_secs(),
            session_duration_secs = config.session.duration_secs,
            "Application state ready"
        );

        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            cache,
            events,
            store,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        self.config.store.timeout()
    }
}

/// Build the complete router for `state`.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut router = Router::new()
        .route(pipeline::ECHO.path, wrap(&state, pipeline::ECHO, any(util::echo)))
        .route(pipeline::LOGIN.path, wrap(&state, pipeline::LOGIN, post(auth::login)))
        .route(
            pipeline::CHECK_SESSION.path,
            wrap(&state, pipeline::CHECK_SESSION, get(auth::check_session)),
        )
        .route(
            pipeline::GET_CONFIG.path,
            wrap(&state, pipeline::GET_CONFIG, get(server_config::get_config)),
        )
        .route(
            pipeline::GET_TASKS.path,
            wrap(&state, pipeline::GET_TASKS, get(tasks::get_tasks)),
        )
        .route(
            pipeline::GET_TASK.path,
            wrap(&state, pipeline::GET_TASK, get(tasks::get_task)),
        )
        .route(
            pipeline::CREATE_TASK.path,
            wrap(&state, pipeline::CREATE_TASK, post(tasks::create_task)),
        )
        .route(
            pipeline::PUT_TASK.path,
            wrap(&state, pipeline::PUT_TASK, put(tasks::put_task)),
        );

    if config.debug.session_apis {
        tracing::warn!("Debug session APIs enabled");
        router = router.merge(debug::router(&state));
    }

    let pages = Router::new()
        .route("/", get(redirect_root))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(from_fn(rewrite_task_links))
        .layer(from_fn_with_state(state.clone(), require_page_session));

    router
        .merge(pages)
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )))
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
        .layer(propagate_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %req.request_id(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .layer(set_request_id())
}

async fn redirect_root(State(state): State<AppState>) -> Redirect {
    Redirect::to(&state.config.server.root_path)
}

/// HTTP server for the tracker.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Serve until `shutdown` fires, then drain and flush sessions.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        self.state.sessions.shutdown().await;
        Ok(())
    }
}
