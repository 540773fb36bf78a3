//! TTL response cache.

use axum::body::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;

/// A memoized response body.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: Bytes,
    pub created_at: DateTime<Utc>,
}

/// A thread-safe cache of response bodies keyed by request target.
///
/// Entries expire lazily: an entry older than the TTL reads as absent and
/// stays in the map until the next population for the same key overwrites
/// it. Concurrent misses on one key may both compute and both `set`; the
/// last writer wins.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: TimeDelta,
}

impl ResponseCache {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Stored body for `key` if it is still within the TTL.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.get_at(key, Utc::now())
    }

    /// Like [`get`](Self::get), evaluated at `now`.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Bytes> {
        let entry = self.entries.get(key)?;
        if now.signed_duration_since(entry.created_at) > self.ttl {
            return None;
        }
        Some(entry.body.clone())
    }

    /// Insert or replace the entry for `key`.
    pub fn set(&self, key: &str, body: Bytes, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                body,
                created_at: now,
            },
        );
        metrics::record_cache_size(self.entries.len());
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
        metrics::record_cache_size(0);
        tracing::info!("Cleared response cache");
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }
}
