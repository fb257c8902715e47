//! In-memory collaborators for tests
//!
//! - `MemoryPayloadStore`: reference-counted payload store that records every
//!   decrement, so tests can check that references are released exactly once
//! - `ManualClock`: clock driven by the test
//! - `RecordingEventLog`: captures expiry events

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use session_core::{Clock, EventLog, PayloadStore, Timestamp};

#[derive(Debug)]
struct StoredPayload {
    bytes: Vec<u8>,
    references: i64,
}

/// Reference-counted payload store backed by a hash map
#[derive(Debug, Default)]
pub struct MemoryPayloadStore {
    payloads: Mutex<FxHashMap<u64, StoredPayload>>,
    next_id: AtomicU64,
    decrements: AtomicUsize,
}

impl MemoryPayloadStore {
    /// Create an empty payload store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload with one reference and return its id
    pub fn add(&self, bytes: Vec<u8>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.payloads.lock().insert(
            id,
            StoredPayload {
                bytes,
                references: 1,
            },
        );
        id
    }

    /// Take one more reference to an existing payload
    pub fn increment(&self, payload_id: u64) {
        if let Some(payload) = self.payloads.lock().get_mut(&payload_id) {
            payload.references += 1;
        }
    }

    /// Current reference count; negative after a double release
    pub fn reference_count(&self, payload_id: u64) -> i64 {
        self.payloads
            .lock()
            .get(&payload_id)
            .map(|p| p.references)
            .unwrap_or(0)
    }

    /// Sum of all reference counts
    pub fn outstanding_references(&self) -> i64 {
        self.payloads.lock().values().map(|p| p.references).sum()
    }

    /// Number of decrements issued so far
    pub fn decrements(&self) -> usize {
        self.decrements.load(Ordering::SeqCst)
    }

    /// Drop a payload regardless of its reference count
    pub fn discard(&self, payload_id: u64) {
        self.payloads.lock().remove(&payload_id);
    }
}

impl PayloadStore for MemoryPayloadStore {
    fn decrement_reference_count(&self, payload_id: u64) {
        self.decrements.fetch_add(1, Ordering::SeqCst);
        if let Some(payload) = self.payloads.lock().get_mut(&payload_id) {
            payload.references -= 1;
        }
    }

    fn get_payload_or_null(&self, payload_id: u64) -> Option<Vec<u8>> {
        self.payloads.lock().get(&payload_id).map(|p| p.bytes.clone())
    }
}

/// Clock whose time only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    /// Jump to `now`
    pub fn set(&self, now: Timestamp) {
        self.millis.store(now.as_millis(), Ordering::SeqCst);
    }

    /// Move forward by `millis`
    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Event log that keeps every expiry event
#[derive(Debug, Default)]
pub struct RecordingEventLog {
    expired: Mutex<Vec<(Timestamp, String)>>,
}

impl RecordingEventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded `(expired_at, client_id)` pairs in arrival order
    pub fn expired(&self) -> Vec<(Timestamp, String)> {
        self.expired.lock().clone()
    }
}

impl EventLog for RecordingEventLog {
    fn client_session_expired(&self, expired_at: Timestamp, client_id: &str) {
        self.expired.lock().push((expired_at, client_id.to_string()));
    }
}
