//! Cross-cutting request layers.
//!
//! Each module provides one `from_fn_with_state` function. Composition order
//! lives in [`crate::http::pipeline`].

pub mod cache;
pub mod event_log;
pub mod json;
pub mod metrics;
pub mod pages;
pub mod request_log;
pub mod session;

pub use session::AuthenticatedSession;
