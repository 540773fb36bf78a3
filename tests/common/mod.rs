//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use tracker_server::config::{ServerConfig, StoreBackend};
use tracker_server::error::PersistenceError;
use tracker_server::model::{EventRecord, NewTask, Task, TaskUpdate};
use tracker_server::store::{DurableStore, MemoryStore};
use tracker_server::AppState;

pub const PASSWORD: &str = "hunter2";
pub const CALLER: &str = "me";

/// Memory store with call counters and failure switches.
#[derive(Default)]
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_sessions: AtomicBool,
    pub batches: Mutex<Vec<HashMap<String, DateTime<Utc>>>>,
}

impl InstrumentedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn read_guard(&self) -> Result<(), PersistenceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable("injected read failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DurableStore for InstrumentedStore {
    async fn persist_new_session(
        &self,
        caller_id: &str,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String, PersistenceError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("injected session failure".into()));
        }
        self.inner.persist_new_session(caller_id, token, created_at).await
    }

    async fn batch_persist_last_accessed(
        &self,
        updates: &HashMap<String, DateTime<Utc>>,
    ) -> Result<(), PersistenceError> {
        self.batches.lock().push(updates.clone());
        self.inner.batch_persist_last_accessed(updates).await
    }

    async fn insert_event(&self, event: &EventRecord) -> Result<(), PersistenceError> {
        self.inner.insert_event(event).await
    }

    async fn get_config(&self) -> Result<BTreeMap<String, serde_json::Value>, PersistenceError> {
        self.read_guard()?;
        self.inner.get_config().await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.list_tasks().await
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, PersistenceError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.get_task(id).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, PersistenceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_task(task).await
    }

    async fn update_task(&self, update: TaskUpdate) -> Result<Option<Task>, PersistenceError> {
        self.inner.update_task(update).await
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Config suitable for in-process tests.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.login_password = PASSWORD.to_string();
    config.auth.caller_id = CALLER.to_string();
    config.store.backend = StoreBackend::Memory;
    config.observability.metrics_enabled = false;
    config.cache.ttl_secs = 60;
    config.debug.session_apis = true;
    config.server.static_dir = std::env::temp_dir().join("tracker-server-no-assets");
    config
}

pub fn test_state(store: Arc<InstrumentedStore>, config: ServerConfig) -> AppState {
    AppState::new(config, store)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn send_json(method: &str, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn login_request(pass: &str, referer: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::REFERER, referer)
        .body(Body::from(format!("pass={pass}")))
        .unwrap()
}

/// Log in and return the `Cookie` header value for the new session.
pub async fn login(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(login_request(
            PASSWORD,
            "http://localhost:8080/login?ref=%2Fsprintboard",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().trim().to_string()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
