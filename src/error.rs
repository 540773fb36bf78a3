//! Error taxonomy shared across subsystems.
//!
//! # Design Decisions
//! - Persistence failures are fatal only to the operation that triggered them
//! - Authentication failures never leak which check failed to the caller
//! - The response cache has no error channel at all

use std::time::Duration;
use thiserror::Error;

/// Durable store unreachable, timed out, or write rejected.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store task failed: {0}")]
    Task(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why a request failed session validation.
///
/// Every variant renders identically to the client; the reason is only used
/// for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no session cookie")]
    MissingCookie,

    #[error("session not recognized")]
    UnknownSession,

    #[error("session expired")]
    Expired,
}

impl AuthError {
    /// Metric label for this failure.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCookie => "missing_cookie",
            AuthError::UnknownSession => "unknown_session",
            AuthError::Expired => "expired",
        }
    }
}
