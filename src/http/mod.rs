//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router-wide layers: request id, trace, body limit, timeout)
//!     → /api/* → pipeline.rs stack → handlers/
//!     → pages  → session check → static files
//!     → response.rs (error mapping, JSON bodies)
//! ```

pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use pipeline::{ApiRoute, ApiType};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ApiError, EventDetails};
pub use server::{build_router, AppState, HttpServer};
