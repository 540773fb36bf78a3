//! Session record type.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One authenticated browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Durable row id returned by the store.
    pub record_id: String,
    /// Opaque token; also the cookie value and map key.
    pub token: String,
    pub caller_id: String,
    pub created_at: DateTime<Utc>,
    /// Bookkeeping only; never extends validity.
    pub last_accessed_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Valid iff `now - created_at <= duration`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, duration: Duration) -> bool {
        now.signed_duration_since(self.created_at) <= to_delta(duration)
    }

    /// Time left before the session stops validating. Negative once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>, duration: Duration) -> TimeDelta {
        match self.created_at.checked_add_signed(to_delta(duration)) {
            Some(end) => end - now,
            None => TimeDelta::MAX,
        }
    }
}

pub(crate) fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
