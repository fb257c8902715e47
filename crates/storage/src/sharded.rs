//! Sharded client session storage
//!
//! A fixed array of buckets, each a DashMap from client identifier to
//! `PersistenceEntry<ClientSession>`. A client identifier is routed to one
//! bucket for its whole lifetime, so no operation ever spans buckets.
//!
//! # Design
//!
//! - DashMap per bucket: lock-free reads from any thread
//! - Per-bucket writer lock: mutations into one bucket are serialized
//! - Per-key entry API: every mutation replaces the whole record in one
//!   read-decide-write step, so readers never see a torn session
//!
//! # Counters
//!
//! Three pieces of state move together on every mutation and are only
//! touched while the bucket writer is held:
//! - `sessions_count`: records that are connected or persistent
//! - `memory_size`: sum of the cached entry size estimates
//! - payload references: one per stored will, released via `WillReferences`
//!
//! None of them is ever recomputed by scanning.
//!
//! # Re-entrancy
//!
//! Collaborators (payload store, event log) are called while a bucket writer
//! is held. A collaborator that calls back into a mutating operation on the
//! same bucket fails with `Error::PreconditionViolation` instead of
//! deadlocking. Payload store callbacks must not read from the store.

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHasher;
use session_core::{
    bucket_index, BucketChunk, ClientSession, Clock, Error, EventLog, NoopEventLog, PayloadStore,
    PendingWill, Result, SystemClock, Timestamp,
};
use tracing::debug;

use crate::config::{ConfigError, StoreConfig};
use crate::entry::PersistenceEntry;
use crate::expiry::{expires_at, is_expired, is_within_grace_period};
use crate::will_refs::WillReferences;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

type SessionMap = DashMap<String, PersistenceEntry<ClientSession>, FxBuildHasher>;

/// One partition of the client identifier space
///
/// Only read access is exposed; every mutation goes through
/// `ClientSessionStore` so counters and will references stay paired.
pub struct Bucket {
    sessions: SessionMap,
    writer: Mutex<()>,
    writer_thread: Mutex<Option<ThreadId>>,
}

impl Bucket {
    fn new() -> Self {
        Self {
            sessions: DashMap::with_hasher(FxBuildHasher::default()),
            writer: Mutex::new(()),
            writer_thread: Mutex::new(None),
        }
    }

    /// Copy of the stored entry for `client_id`, tombstones included
    pub fn get_entry(&self, client_id: &str) -> Option<PersistenceEntry<ClientSession>> {
        self.sessions.get(client_id).map(|entry| entry.value().clone())
    }

    /// Whether a record exists for `client_id`
    pub fn contains(&self, client_id: &str) -> bool {
        self.sessions.contains_key(client_id)
    }

    /// Number of records, tombstones included
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if bucket is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Acquire the single writer of this bucket
    ///
    /// Blocks while another thread writes. Fails if the calling thread
    /// already holds the writer.
    fn write(&self, index: usize) -> Result<BucketWriteGuard<'_>> {
        let current = thread::current().id();
        if *self.writer_thread.lock() == Some(current) {
            return Err(Error::PreconditionViolation(format!(
                "bucket {} is already being written by the calling thread",
                index
            )));
        }
        let guard = self.writer.lock();
        *self.writer_thread.lock() = Some(current);
        Ok(BucketWriteGuard {
            bucket: self,
            _guard: guard,
        })
    }
}

impl Default for Bucket {
    fn default() -> Self {
        Self::new()
    }
}

struct BucketWriteGuard<'a> {
    bucket: &'a Bucket,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for BucketWriteGuard<'_> {
    fn drop(&mut self) {
        // Runs before `_guard` is released.
        *self.bucket.writer_thread.lock() = None;
    }
}

/// Sharded in-memory store of client sessions
///
/// # Thread Safety
///
/// - Reads: any thread, any time, never blocked by writers of other keys
/// - Mutations: serialized per bucket; different buckets never contend
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use session_core::{ClientSession, Timestamp};
/// use session_storage::{ClientSessionStore, StoreConfig};
/// use session_storage::testing::MemoryPayloadStore;
///
/// let store = ClientSessionStore::new(StoreConfig::default(), Arc::new(MemoryPayloadStore::new())).unwrap();
/// store.put_by_id("c1", ClientSession::new(true, 30), Timestamp::now()).unwrap();
/// assert_eq!(store.sessions_count(), 1);
/// ```
pub struct ClientSessionStore {
    buckets: Box<[Bucket]>,
    sessions_count: AtomicUsize,
    memory_size: AtomicU64,
    default_session_expiry_interval: i64,
    wills: WillReferences,
    event_log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
}

impl ClientSessionStore {
    /// Create a store with the system clock and no audit log
    pub fn new(config: StoreConfig, payloads: Arc<dyn PayloadStore>) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let buckets = (0..config.bucket_count).map(|_| Bucket::new()).collect();
        Ok(Self {
            buckets,
            sessions_count: AtomicUsize::new(0),
            memory_size: AtomicU64::new(0),
            default_session_expiry_interval: config.default_session_expiry_interval,
            wills: WillReferences::new(payloads),
            event_log: Arc::new(NoopEventLog),
            clock: Arc::new(SystemClock),
        })
    }

    /// Send expiry events to `event_log` (builder pattern)
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = event_log;
        self
    }

    /// Take "now" from `clock` (builder pattern)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ========================================================================
    // Buckets and counters
    // ========================================================================

    /// Number of buckets
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket a client identifier is routed to
    #[inline]
    pub fn bucket_of(&self, client_id: &str) -> usize {
        bucket_index(client_id, self.buckets.len())
    }

    /// The bucket at `index`
    pub fn bucket(&self, index: usize) -> Result<&Bucket> {
        self.buckets.get(index).ok_or_else(|| {
            Error::invalid_argument(format!(
                "Bucket index {} out of range, bucket count is {}",
                index,
                self.buckets.len()
            ))
        })
    }

    /// Number of connected or persistent sessions
    #[inline]
    pub fn sessions_count(&self) -> usize {
        self.sessions_count.load(Ordering::Acquire)
    }

    /// Estimated bytes held by all entries
    #[inline]
    pub fn memory_size(&self) -> u64 {
        self.memory_size.load(Ordering::Acquire)
    }

    /// Total number of records across all buckets, tombstones included
    pub fn total_entries(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    /// Count connected or persistent sessions by scanning every bucket
    ///
    /// Not used by the store itself; lets callers verify `sessions_count`.
    pub fn recount_sessions(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.sessions.iter())
            .filter(|entry| entry.value().object().counts_as_session())
            .count()
    }

    /// Sum entry sizes by scanning every bucket; verification counterpart
    /// of `memory_size`
    pub fn recompute_memory_size(&self) -> u64 {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.sessions.iter())
            .map(|entry| entry.value().estimated_size() as u64)
            .sum()
    }

    /// Release resources held for a bucket; nothing to do in memory
    pub fn close_bucket(&self, index: usize) -> Result<()> {
        self.bucket(index).map(|_| ())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Look up a session
    ///
    /// Returns a copy whose will payload is stripped, or resolved from the
    /// payload store when `include_will` is set. With `check_expired`,
    /// expired sessions read as absent.
    pub fn get_session(
        &self,
        client_id: &str,
        bucket_index: usize,
        check_expired: bool,
        include_will: bool,
    ) -> Result<Option<ClientSession>> {
        let bucket = self.bucket(bucket_index)?;
        let Some((mut session, timestamp)) = bucket
            .sessions
            .get(client_id)
            .map(|entry| (entry.object().deep_copy_without_payload(), entry.timestamp()))
        else {
            return Ok(None);
        };

        if check_expired && is_expired(&session, self.clock.now().millis_since(timestamp)) {
            return Ok(None);
        }
        if include_will {
            self.wills.attach_payload_if_missing(&mut session);
        }
        Ok(Some(session))
    }

    /// Look up a session, routing by identifier, hiding expired sessions and
    /// resolving the will payload
    pub fn get_session_by_id(&self, client_id: &str) -> Result<Option<ClientSession>> {
        self.get_session(client_id, self.bucket_of(client_id), true, true)
    }

    /// Time of the last mutation of a session
    pub fn get_timestamp(&self, client_id: &str, bucket_index: usize) -> Result<Option<Timestamp>> {
        let bucket = self.bucket(bucket_index)?;
        Ok(bucket.sessions.get(client_id).map(|entry| entry.timestamp()))
    }

    /// `get_timestamp`, routing by identifier
    pub fn get_timestamp_by_id(&self, client_id: &str) -> Result<Option<Timestamp>> {
        self.get_timestamp(client_id, self.bucket_of(client_id))
    }

    /// Every client identifier stored in a bucket, tombstones included
    pub fn get_all_clients(&self, bucket_index: usize) -> Result<HashSet<String>> {
        let bucket = self.bucket(bucket_index)?;
        Ok(bucket.sessions.iter().map(|entry| entry.key().clone()).collect())
    }

    /// Non-expired sessions of a bucket whose identifier matches `filter`
    ///
    /// Sessions are returned without their will. The whole bucket is always
    /// returned as one finished chunk; `_last_key` and `_max_memory` are
    /// accepted for parity with page-oriented backends.
    pub fn get_all_clients_chunk<F>(
        &self,
        filter: F,
        bucket_index: usize,
        _last_key: Option<&str>,
        _max_memory: usize,
    ) -> Result<BucketChunk<HashMap<String, ClientSession>>>
    where
        F: Fn(&str) -> bool,
    {
        let bucket = self.bucket(bucket_index)?;
        let now = self.clock.now();
        let sessions = bucket
            .sessions
            .iter()
            .filter(|entry| filter(entry.key()))
            .filter(|entry| !is_expired(entry.object(), now.millis_since(entry.timestamp())))
            .map(|entry| (entry.key().clone(), entry.object().copy_without_will()))
            .collect();
        Ok(BucketChunk::complete(sessions, bucket_index))
    }

    /// Disconnected clients still inside their session expiry window
    pub fn get_disconnected_clients(&self, bucket_index: usize) -> Result<HashSet<String>> {
        let bucket = self.bucket(bucket_index)?;
        let now = self.clock.now();
        Ok(bucket
            .sessions
            .iter()
            .filter(|entry| is_within_grace_period(entry.object(), now.millis_since(entry.timestamp())))
            .map(|entry| entry.key().clone())
            .collect())
    }

    /// Wills of disconnected clients that still have to be published
    ///
    /// The effective delay is bounded by the session expiry: a will is due
    /// when its own delay elapses or the session ends, whichever is first.
    pub fn get_pending_wills(&self, bucket_index: usize) -> Result<HashMap<String, PendingWill>> {
        let bucket = self.bucket(bucket_index)?;
        Ok(bucket
            .sessions
            .iter()
            .filter(|entry| !entry.object().is_connected())
            .filter_map(|entry| {
                let session = entry.object();
                session.will().map(|will| {
                    let delay = will.delay_interval().min(session.session_expiry_interval());
                    (entry.key().clone(), PendingWill::new(delay, will.delay_interval()))
                })
            })
            .collect())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Insert or replace a session
    ///
    /// Any will held by the replaced record is released, whether or not the
    /// new session carries one. The will payload bytes are never stored;
    /// only the payload id is kept.
    pub fn put(
        &self,
        client_id: &str,
        session: ClientSession,
        timestamp: Timestamp,
        bucket_index: usize,
    ) -> Result<()> {
        if !timestamp.is_positive() {
            return Err(Error::invalid_argument("Timestamp must be greater than 0"));
        }
        let bucket = self.bucket(bucket_index)?;
        let _writer = bucket.write(bucket_index)?;

        let stored = session.deep_copy_without_payload();
        let counts = stored.counts_as_session();
        let entry = PersistenceEntry::new(stored, timestamp);

        match bucket.sessions.entry(client_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let old = occupied.get();
                self.sub_memory(old.estimated_size());
                self.wills.release(old.object());
                self.adjust_sessions_count(old.object().counts_as_session(), counts);

                self.add_memory(entry.estimated_size());
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                self.adjust_sessions_count(false, counts);
                self.add_memory(entry.estimated_size());
                vacant.insert(entry);
            }
        }
        Ok(())
    }

    /// `put`, routing by identifier
    pub fn put_by_id(&self, client_id: &str, session: ClientSession, timestamp: Timestamp) -> Result<()> {
        self.put(client_id, session, timestamp, self.bucket_of(client_id))
    }

    /// Mark a session as disconnected
    ///
    /// An unknown client gets a tombstone with the configured default
    /// expiry. `expiry`, when given, replaces the stored expiry interval.
    /// Without `send_will` the will is released and cleared. Returns a copy
    /// with the will payload resolved, ready to be published.
    pub fn disconnect(
        &self,
        client_id: &str,
        timestamp: Timestamp,
        send_will: bool,
        bucket_index: usize,
        expiry: Option<i64>,
    ) -> Result<ClientSession> {
        let bucket = self.bucket(bucket_index)?;
        let _writer = bucket.write(bucket_index)?;

        let mut result = match bucket.sessions.entry(client_id.to_string()) {
            Entry::Vacant(vacant) => {
                let tombstone = ClientSession::new(false, self.default_session_expiry_interval);
                self.adjust_sessions_count(false, tombstone.counts_as_session());
                let entry = PersistenceEntry::new(tombstone, timestamp);
                self.add_memory(entry.estimated_size());
                vacant.insert(entry).object().deep_copy_without_payload()
            }
            Entry::Occupied(mut occupied) => {
                let old = occupied.get();
                self.sub_memory(old.estimated_size());
                let old_session = old.object();

                let mut session = if send_will {
                    old_session.clone()
                } else {
                    self.wills.release(old_session);
                    old_session.copy_without_will()
                };
                if let Some(expiry) = expiry {
                    session.set_session_expiry_interval(expiry);
                }
                session.set_connected(false);
                self.wills.drop_dangling(&mut session);
                self.adjust_sessions_count(old_session.counts_as_session(), session.counts_as_session());

                let copy = session.deep_copy_without_payload();
                let entry = PersistenceEntry::new(session, timestamp);
                self.add_memory(entry.estimated_size());
                occupied.insert(entry);
                copy
            }
        };

        self.wills.attach_payload_if_missing(&mut result);
        Ok(result)
    }

    /// `disconnect`, routing by identifier
    pub fn disconnect_by_id(
        &self,
        client_id: &str,
        timestamp: Timestamp,
        send_will: bool,
        expiry: Option<i64>,
    ) -> Result<ClientSession> {
        self.disconnect(client_id, timestamp, send_will, self.bucket_of(client_id), expiry)
    }

    /// Delete a session unconditionally
    ///
    /// Removing an absent client is a no-op.
    pub fn remove_with_timestamp(&self, client_id: &str, bucket_index: usize) -> Result<()> {
        let bucket = self.bucket(bucket_index)?;
        let _writer = bucket.write(bucket_index)?;

        if let Some((_, removed)) = bucket.sessions.remove(client_id) {
            let session = removed.object();
            self.adjust_sessions_count(session.counts_as_session(), false);
            self.wills.release(session);
            self.sub_memory(removed.estimated_size());
        }
        Ok(())
    }

    /// `remove_with_timestamp`, routing by identifier
    pub fn remove_by_id(&self, client_id: &str) -> Result<()> {
        self.remove_with_timestamp(client_id, self.bucket_of(client_id))
    }

    /// Remove every expired session of a bucket
    ///
    /// Each removal is reported to the event log with the instant the
    /// session expired. Returns the removed client identifiers.
    pub fn clean_up(&self, bucket_index: usize) -> Result<HashSet<String>> {
        let bucket = self.bucket(bucket_index)?;
        let _writer = bucket.write(bucket_index)?;

        let now = self.clock.now();
        let mut expired: Vec<(String, Timestamp)> = Vec::new();

        bucket.sessions.retain(|client_id, entry| {
            let session = entry.object();
            if !is_expired(session, now.millis_since(entry.timestamp())) {
                return true;
            }
            self.adjust_sessions_count(session.counts_as_session(), false);
            self.wills.release(session);
            self.sub_memory(entry.estimated_size());
            expired.push((client_id.clone(), expires_at(session, entry.timestamp())));
            false
        });

        for (client_id, expired_at) in &expired {
            debug!(client_id = %client_id, expired_at = %expired_at, "Client session expired");
            self.event_log.client_session_expired(*expired_at, client_id);
        }
        if !expired.is_empty() {
            debug!(bucket = bucket_index, removed = expired.len(), "Expired sessions removed");
        }
        Ok(expired.into_iter().map(|(client_id, _)| client_id).collect())
    }

    /// Change the expiry interval of an existing session
    ///
    /// Fails with `NoSession` for absent clients and tombstones. The entry
    /// is restamped with the current time.
    pub fn set_session_expiry_interval(
        &self,
        client_id: &str,
        session_expiry_interval: i64,
        bucket_index: usize,
    ) -> Result<()> {
        if session_expiry_interval < 0 {
            return Err(Error::invalid_argument(format!(
                "Invalid session expiry interval {}",
                session_expiry_interval
            )));
        }
        let bucket = self.bucket(bucket_index)?;
        let _writer = bucket.write(bucket_index)?;

        let mut stored = bucket.sessions.get_mut(client_id).ok_or(Error::NoSession)?;
        let old_session = stored.object();
        if old_session.is_tombstone() {
            return Err(Error::NoSession);
        }

        let mut session = old_session.clone();
        session.set_session_expiry_interval(session_expiry_interval);
        self.adjust_sessions_count(true, session.counts_as_session());

        let entry = PersistenceEntry::new(session, self.clock.now());
        self.sub_memory(stored.estimated_size());
        self.add_memory(entry.estimated_size());
        *stored = entry;
        Ok(())
    }

    /// `set_session_expiry_interval`, routing by identifier
    pub fn set_session_expiry_interval_by_id(&self, client_id: &str, session_expiry_interval: i64) -> Result<()> {
        self.set_session_expiry_interval(client_id, session_expiry_interval, self.bucket_of(client_id))
    }

    /// Release and clear the will of a disconnected session
    ///
    /// Connected sessions are left untouched. Returns the updated entry, or
    /// `None` if the client is unknown or connected.
    pub fn remove_will(
        &self,
        client_id: &str,
        bucket_index: usize,
    ) -> Result<Option<PersistenceEntry<ClientSession>>> {
        let bucket = self.bucket(bucket_index)?;
        let _writer = bucket.write(bucket_index)?;

        let Some(mut stored) = bucket.sessions.get_mut(client_id) else {
            return Ok(None);
        };
        if stored.object().is_connected() {
            return Ok(None);
        }

        self.sub_memory(stored.estimated_size());
        self.wills.release(stored.object());
        let entry = PersistenceEntry::new(stored.object().copy_without_will(), stored.timestamp());
        self.add_memory(entry.estimated_size());
        *stored = entry;

        Ok(Some(PersistenceEntry::new(
            stored.object().deep_copy_without_payload(),
            stored.timestamp(),
        )))
    }

    /// `remove_will`, routing by identifier
    pub fn remove_will_by_id(&self, client_id: &str) -> Result<Option<PersistenceEntry<ClientSession>>> {
        self.remove_will(client_id, self.bucket_of(client_id))
    }

    // ========================================================================
    // Counter helpers
    // ========================================================================

    #[inline]
    fn adjust_sessions_count(&self, counted_before: bool, counted_after: bool) {
        match (counted_before, counted_after) {
            (false, true) => {
                self.sessions_count.fetch_add(1, Ordering::AcqRel);
            }
            (true, false) => {
                self.sessions_count.fetch_sub(1, Ordering::AcqRel);
            }
            _ => {}
        }
    }

    #[inline]
    fn add_memory(&self, size: usize) {
        self.memory_size.fetch_add(size as u64, Ordering::AcqRel);
    }

    #[inline]
    fn sub_memory(&self, size: usize) {
        self.memory_size.fetch_sub(size as u64, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for ClientSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSessionStore")
            .field("bucket_count", &self.bucket_count())
            .field("sessions_count", &self.sessions_count())
            .field("memory_size", &self.memory_size())
            .field("total_entries", &self.total_entries())
            .finish()
    }
}
