//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! login            → registry.rs create_session (store write, then map insert)
//! every API call   → registry.rs validate + touch_access (memory only)
//!                        └─ debounced → pending batch
//! flusher.rs tick  → swap pending batch → store batch write (detached)
//!                  → sweep expired sessions
//! shutdown         → stop flusher → final synchronous flush
//! ```
//!
//! # Design Decisions
//! - Validity is a fixed window from creation; access never extends it
//! - Access times are bookkeeping: batched, best effort, never retried
//! - The session map and the pending batch use separate locks, never nested

mod flusher;
pub mod record;
pub mod registry;

pub use record::SessionRecord;
pub use registry::{AccessUpdate, SessionRegistry, SessionSettings};
