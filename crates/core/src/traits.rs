//! Collaborator traits
//!
//! The session store depends on three things it does not own:
//! - `PayloadStore`: reference-counted blob store holding will payloads
//! - `EventLog`: audit sink told about sessions removed by expiry
//! - `Clock`: source of "now" for expiry checks
//!
//! All three are object-safe and `Send + Sync` so the store can hold them
//! as `Arc<dyn ...>` and be shared across threads.

use crate::timestamp::Timestamp;

/// Reference-counted payload store
///
/// The increment for a will payload happens upstream, before the payload id
/// is handed to the session store. The store only ever decrements.
pub trait PayloadStore: Send + Sync {
    /// Release one reference to the payload
    fn decrement_reference_count(&self, payload_id: u64);

    /// Fetch the payload bytes, `None` if the payload was already discarded
    fn get_payload_or_null(&self, payload_id: u64) -> Option<Vec<u8>>;
}

/// Audit sink for session lifecycle events
pub trait EventLog: Send + Sync {
    /// A session was removed because it expired at `expired_at`
    fn client_session_expired(&self, expired_at: Timestamp, client_id: &str);
}

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Event log that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventLog;

impl EventLog for NoopEventLog {
    fn client_session_expired(&self, _expired_at: Timestamp, _client_id: &str) {}
}
