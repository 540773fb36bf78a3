//! Task tracker HTTP backend.
//!
//! Cookie sessions with batched persistence, a TTL response cache and an
//! ordered per-route middleware stack in front of a pluggable durable store.

pub mod cache;
pub mod config;
pub mod debug;
pub mod error;
pub mod eventlog;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod session;
pub mod store;

pub use config::ServerConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
