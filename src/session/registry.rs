//! In-memory session registry with deferred, batched persistence.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::flusher::Flusher;
use super::record::{to_delta, SessionRecord};
use crate::config::schema::SessionConfig;
use crate::error::{AuthError, PersistenceError};
use crate::observability::metrics;
use crate::store::{with_deadline, DurableStore};

/// Timing parameters for the registry.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Fixed validity window measured from creation.
    pub duration: Duration,
    /// Minimum gap between two queued access times for one token.
    pub debounce: Duration,
    /// Cadence of the background flush.
    pub flush_interval: Duration,
    /// Deadline for every store call the registry makes.
    pub store_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &SessionConfig, store_timeout: Duration) -> Self {
        Self {
            duration: config.duration(),
            debounce: config.debounce(),
            flush_interval: config.flush_interval(),
            store_timeout,
        }
    }
}

/// Result of a successful [`SessionRegistry::touch_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessUpdate {
    pub previous: DateTime<Utc>,
    pub current: DateTime<Utc>,
    /// Whether this touch put an update into the pending batch.
    pub queued: bool,
}

struct SessionEntry {
    record: SessionRecord,
    /// Access time most recently handed to the pending batch.
    last_queued_at: DateTime<Utc>,
}

/// State shared between the registry handle and its flusher.
///
/// `sessions` and `pending` are independent locks. No code path holds both
/// at once.
pub(crate) struct Shared {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    pending: Mutex<HashMap<String, DateTime<Utc>>>,
    store: Arc<dyn DurableStore>,
    settings: SessionSettings,
}

impl Shared {
    /// Swap the pending batch for an empty one.
    pub(crate) fn take_pending(&self) -> HashMap<String, DateTime<Utc>> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Write one batch. Failures drop the batch; nothing is retried.
    pub(crate) async fn persist_batch(
        &self,
        batch: HashMap<String, DateTime<Utc>>,
    ) -> Result<usize, PersistenceError> {
        let size = batch.len();
        let result = with_deadline(
            self.settings.store_timeout,
            self.store.batch_persist_last_accessed(&batch),
        )
        .await;

        match result {
            Ok(()) => {
                tracing::debug!(updates = size, "Flushed session access times");
                metrics::record_session_flush(size, true);
                Ok(size)
            }
            Err(e) => {
                tracing::warn!(
                    updates = size,
                    error = %e,
                    "Dropping session access batch after failed write"
                );
                metrics::record_session_flush(size, false);
                Err(e)
            }
        }
    }

    /// Remove sessions whose validity window has closed.
    pub(crate) fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let duration = self.settings.duration;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.record.is_valid_at(now, duration));
        let evicted = before - sessions.len();
        let remaining = sessions.len();
        drop(sessions);

        if evicted > 0 {
            tracing::debug!(evicted, remaining, "Evicted expired sessions");
        }
        metrics::record_session_count(remaining);
        evicted
    }
}

/// Answers "is this token valid and whose is it" without touching the store
/// on the hot path.
///
/// Created with [`SessionRegistry::start`], which also launches the flusher.
/// Call [`SessionRegistry::shutdown`] before exit to persist the last batch.
pub struct SessionRegistry {
    shared: Arc<Shared>,
    flusher: Mutex<Option<Flusher>>,
}

impl SessionRegistry {
    /// Build a registry and start its background flush task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(store: Arc<dyn DurableStore>, settings: SessionSettings) -> Self {
        let shared = Arc::new(Shared {
            sessions: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            store,
            settings,
        });
        let flusher = Flusher::spawn(Arc::clone(&shared), settings.flush_interval);

        Self {
            shared,
            flusher: Mutex::new(Some(flusher)),
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.shared.settings
    }

    /// Persist a new session, then make it visible in memory.
    ///
    /// Nothing is inserted if the store write fails or times out.
    pub async fn create_session(
        &self,
        caller_id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, PersistenceError> {
        let record_id = with_deadline(
            self.shared.settings.store_timeout,
            self.shared.store.persist_new_session(caller_id, token, now),
        )
        .await?;

        let record = SessionRecord {
            record_id,
            token: token.to_string(),
            caller_id: caller_id.to_string(),
            created_at: now,
            last_accessed_at: now,
        };

        let count = {
            let mut sessions = self.shared.sessions.write();
            sessions.insert(
                token.to_string(),
                SessionEntry {
                    record: record.clone(),
                    last_queued_at: now,
                },
            );
            sessions.len()
        };
        metrics::record_session_count(count);
        tracing::info!(caller_id, record_id = %record.record_id, "Session created");

        Ok(record)
    }

    pub fn get_session(&self, token: &str) -> Option<SessionRecord> {
        self.shared
            .sessions
            .read()
            .get(token)
            .map(|entry| entry.record.clone())
    }

    /// Record an access at `now`.
    ///
    /// The stored access time only moves forward. An update is queued for
    /// persistence when more than the debounce threshold has passed since the
    /// last queued access for this token. Returns `None` for unknown tokens.
    pub fn touch_access(&self, token: &str, now: DateTime<Utc>) -> Option<AccessUpdate> {
        let debounce = to_delta(self.shared.settings.debounce);

        let (update, queue_at) = {
            let mut sessions = self.shared.sessions.write();
            let entry = sessions.get_mut(token)?;

            let previous = entry.record.last_accessed_at;
            let current = previous.max(now);
            entry.record.last_accessed_at = current;

            let queue_at = if current.signed_duration_since(entry.last_queued_at) > debounce {
                entry.last_queued_at = current;
                Some(current)
            } else {
                None
            };

            let update = AccessUpdate {
                previous,
                current,
                queued: queue_at.is_some(),
            };
            (update, queue_at)
        };

        if let Some(at) = queue_at {
            let mut pending = self.shared.pending.lock();
            let slot = pending.entry(token.to_string()).or_insert(at);
            if *slot < at {
                *slot = at;
            }
        }

        Some(update)
    }

    /// `now - created_at <= duration`.
    pub fn is_valid(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        record.is_valid_at(now, self.shared.settings.duration)
    }

    /// Resolve a cookie value to a live session.
    ///
    /// Does not touch the session.
    pub fn validate(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, AuthError> {
        let token = token.ok_or(AuthError::MissingCookie)?;
        let record = self.get_session(token).ok_or(AuthError::UnknownSession)?;
        if !self.is_valid(&record, now) {
            return Err(AuthError::Expired);
        }
        Ok(record)
    }

    /// Forget every in-memory session. The store and pending batch are left alone.
    pub fn clear_all(&self) {
        let cleared = {
            let mut sessions = self.shared.sessions.write();
            let cleared = sessions.len();
            *sessions = HashMap::new();
            cleared
        };
        metrics::record_session_count(0);
        tracing::info!(cleared, "Cleared in-memory sessions");
    }

    /// Snapshot of every in-memory session, oldest first.
    pub fn list_all(&self) -> Vec<SessionRecord> {
        let mut records: Vec<SessionRecord> = self
            .shared
            .sessions
            .read()
            .values()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    /// Copy of the batch awaiting the next flush.
    pub fn pending_updates(&self) -> HashMap<String, DateTime<Utc>> {
        self.shared.pending.lock().clone()
    }

    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        self.shared.evict_expired(now)
    }

    /// Swap and persist the pending batch now, waiting for the write.
    ///
    /// Returns the number of updates written. An empty batch is not sent.
    pub async fn flush_now(&self) -> Result<usize, PersistenceError> {
        let batch = self.shared.take_pending();
        if batch.is_empty() {
            return Ok(0);
        }
        self.shared.persist_batch(batch).await
    }

    /// Stop the flusher and run one final synchronous flush.
    ///
    /// Safe to call more than once; later calls only flush.
    pub async fn shutdown(&self) {
        let flusher = self.flusher.lock().take();
        if let Some(flusher) = flusher {
            flusher.stop().await;
        }

        match self.flush_now().await {
            Ok(0) => tracing::info!("Session registry stopped, nothing to flush"),
            Ok(n) => tracing::info!(updates = n, "Session registry stopped after final flush"),
            Err(e) => tracing::warn!(error = %e, "Final session flush failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventRecord, NewTask, Task, TaskUpdate};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store that records every batch and can be told to fail.
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        batches: Mutex<Vec<HashMap<String, DateTime<Utc>>>>,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl DurableStore for RecordingStore {
        async fn persist_new_session(
            &self,
            caller_id: &str,
            token: &str,
            created_at: DateTime<Utc>,
        ) -> Result<String, PersistenceError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unavailable("injected".into()));
            }
            self.inner.persist_new_session(caller_id, token, created_at).await
        }

        async fn batch_persist_last_accessed(
            &self,
            updates: &HashMap<String, DateTime<Utc>>,
        ) -> Result<(), PersistenceError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unavailable("injected".into()));
            }
            self.batches.lock().push(updates.clone());
            self.inner.batch_persist_last_accessed(updates).await
        }

        async fn insert_event(&self, event: &EventRecord) -> Result<(), PersistenceError> {
            self.inner.insert_event(event).await
        }

        async fn get_config(
            &self,
        ) -> Result<BTreeMap<String, serde_json::Value>, PersistenceError> {
            self.inner.get_config().await
        }

        async fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
            self.inner.list_tasks().await
        }

        async fn get_task(&self, id: &str) -> Result<Option<Task>, PersistenceError> {
            self.inner.get_task(id).await
        }

        async fn create_task(&self, task: NewTask) -> Result<Task, PersistenceError> {
            self.inner.create_task(task).await
        }

        async fn update_task(
            &self,
            update: TaskUpdate,
        ) -> Result<Option<Task>, PersistenceError> {
            self.inner.update_task(update).await
        }

        async fn ping(&self) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            duration: Duration::from_secs(7200),
            debounce: Duration::from_secs(10),
            // long enough that the background tick never fires in a test
            flush_interval: Duration::from_secs(3600),
            store_timeout: Duration::from_secs(5),
        }
    }

    fn registry() -> (Arc<RecordingStore>, SessionRegistry) {
        let store = Arc::new(RecordingStore::default());
        let registry = SessionRegistry::start(store.clone(), settings());
        (store, registry)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_debounced_touch_and_flush_scenario() {
        let (store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();

        let first = registry
            .touch_access("abc", t0() + TimeDelta::seconds(5))
            .unwrap();
        assert!(!first.queued);
        assert!(registry.pending_updates().is_empty());

        let second = registry
            .touch_access("abc", t0() + TimeDelta::seconds(15))
            .unwrap();
        assert!(second.queued);
        assert_eq!(second.previous, t0() + TimeDelta::seconds(5));
        assert_eq!(
            registry.pending_updates().get("abc"),
            Some(&(t0() + TimeDelta::seconds(15)))
        );

        assert_eq!(registry.flush_now().await.unwrap(), 1);

        let batches = store.batches.lock().clone();
        assert_eq!(batches.len(), 1);
        let mut expected = HashMap::new();
        expected.insert("abc".to_string(), t0() + TimeDelta::seconds(15));
        assert_eq!(batches[0], expected);
        assert!(registry.pending_updates().is_empty());

        let stored = store.inner.stored_session("abc").unwrap();
        assert_eq!(stored.last_accessed_at, t0() + TimeDelta::seconds(15));
    }

    #[tokio::test]
    async fn test_rapid_touches_coalesce_to_one_pending_entry() {
        let (_store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();

        for secs in [11, 13, 15, 19, 25, 40] {
            registry.touch_access("abc", t0() + TimeDelta::seconds(secs));
        }

        let pending = registry.pending_updates();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending["abc"], t0() + TimeDelta::seconds(40));
    }

    #[tokio::test]
    async fn test_touch_unknown_token_has_no_side_effects() {
        let (_store, registry) = registry();
        assert!(registry.touch_access("nope", t0()).is_none());
        assert!(registry.pending_updates().is_empty());
        assert_eq!(registry.list_all().len(), 0);
    }

    #[tokio::test]
    async fn test_touch_never_changes_validity() {
        let (_store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();

        let late = t0() + TimeDelta::seconds(7201);
        registry.touch_access("abc", t0() + TimeDelta::seconds(7000));
        let record = registry.get_session("abc").unwrap();
        assert!(!registry.is_valid(&record, late));
        assert!(registry.is_valid(&record, t0() + TimeDelta::seconds(7200)));
    }

    #[tokio::test]
    async fn test_last_accessed_is_monotonic() {
        let (_store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();

        registry.touch_access("abc", t0() + TimeDelta::seconds(30));
        let update = registry
            .touch_access("abc", t0() + TimeDelta::seconds(20))
            .unwrap();
        assert_eq!(update.current, t0() + TimeDelta::seconds(30));
        assert_eq!(
            registry.get_session("abc").unwrap().last_accessed_at,
            t0() + TimeDelta::seconds(30)
        );
    }

    #[tokio::test]
    async fn test_create_failure_inserts_nothing() {
        let (store, registry) = registry();
        store.fail_writes.store(true, Ordering::SeqCst);

        let result = registry.create_session("me", "abc", t0()).await;
        assert!(matches!(result, Err(PersistenceError::Unavailable(_))));
        assert!(registry.get_session("abc").is_none());
        assert_eq!(registry.list_all().len(), 0);
    }

    #[tokio::test]
    async fn test_failed_flush_drops_batch() {
        let (store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();
        registry.touch_access("abc", t0() + TimeDelta::seconds(20));

        store.fail_writes.store(true, Ordering::SeqCst);
        assert!(registry.flush_now().await.is_err());
        assert!(registry.pending_updates().is_empty());

        store.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(registry.flush_now().await.unwrap(), 0);
        assert!(store.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_validate_reasons() {
        let (_store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();

        assert_eq!(
            registry.validate(None, t0()).unwrap_err(),
            AuthError::MissingCookie
        );
        assert_eq!(
            registry.validate(Some("zzz"), t0()).unwrap_err(),
            AuthError::UnknownSession
        );
        assert_eq!(
            registry
                .validate(Some("abc"), t0() + TimeDelta::seconds(7201))
                .unwrap_err(),
            AuthError::Expired
        );
        assert_eq!(registry.validate(Some("abc"), t0()).unwrap().caller_id, "me");
    }

    #[tokio::test]
    async fn test_clear_all_keeps_pending_batch() {
        let (_store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();
        registry.touch_access("abc", t0() + TimeDelta::seconds(20));

        registry.clear_all();
        assert!(registry.get_session("abc").is_none());
        assert_eq!(registry.pending_updates().len(), 1);
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let (_store, registry) = registry();
        registry.create_session("me", "old", t0()).await.unwrap();
        registry
            .create_session("me", "new", t0() + TimeDelta::seconds(3600))
            .await
            .unwrap();

        let evicted = registry.evict_expired(t0() + TimeDelta::seconds(7300));
        assert_eq!(evicted, 1);
        assert!(registry.get_session("old").is_none());
        assert!(registry.get_session("new").is_some());
    }

    #[tokio::test]
    async fn test_shutdown_performs_final_flush() {
        let (store, registry) = registry();
        registry.create_session("me", "abc", t0()).await.unwrap();
        registry.touch_access("abc", t0() + TimeDelta::seconds(20));

        registry.shutdown().await;
        assert!(registry.pending_updates().is_empty());
        assert_eq!(store.batches.lock().len(), 1);

        // second call is harmless
        registry.shutdown().await;
        assert_eq!(store.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_background_tick_flushes() {
        let store = Arc::new(RecordingStore::default());
        let registry = SessionRegistry::start(
            store.clone(),
            SessionSettings {
                flush_interval: Duration::from_millis(50),
                ..settings()
            },
        );
        let now = Utc::now();
        registry.create_session("me", "abc", now).await.unwrap();
        registry.touch_access("abc", now + TimeDelta::seconds(20));

        let mut flushed = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            if !store.batches.lock().is_empty() {
                flushed = true;
                break;
            }
        }

        assert!(flushed);
        assert!(registry.pending_updates().is_empty());
        assert_eq!(store.batches.lock().len(), 1);
        registry.shutdown().await;
    }
}
