//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! cacheable request (Get / GetMany)
//!     → key = request target (path + query)
//!     → store.rs lookup
//!         hit  → body written directly, handler skipped
//!         miss → handler runs, 200 body captured → store.rs set
//! ```
//!
//! # Design Decisions
//! - Keys carry no caller dimension; the system has exactly one caller
//! - No proactive sweep; expiry is checked on read
//! - No single-flight: concurrent misses recompute (handlers are idempotent reads)

pub mod store;

pub use store::{CacheEntry, ResponseCache};

/// What the cache layer did for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Skipped,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Skipped => "SKIP",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
