//! Session expiry predicate
//!
//! A disconnected session expires once the time since its last mutation
//! reaches its expiry interval. Connected sessions never expire, and a
//! session that asked to expire on disconnect is expired the moment it is
//! disconnected.

use session_core::{ClientSession, Timestamp, SESSION_EXPIRE_ON_DISCONNECT};

/// Expiry interval in milliseconds, saturating
#[inline]
fn interval_millis(session_expiry_interval: i64) -> i64 {
    session_expiry_interval.saturating_mul(1_000)
}

/// Whether `session` is expired `elapsed_millis` after its last mutation
pub fn is_expired(session: &ClientSession, elapsed_millis: i64) -> bool {
    if session.is_connected() {
        return false;
    }
    let interval = session.session_expiry_interval();
    if interval <= SESSION_EXPIRE_ON_DISCONNECT {
        return true;
    }
    elapsed_millis >= interval_millis(interval)
}

/// Whether `session` is disconnected but still inside its expiry window
pub fn is_within_grace_period(session: &ClientSession, elapsed_millis: i64) -> bool {
    !session.is_connected()
        && session.session_expiry_interval() > SESSION_EXPIRE_ON_DISCONNECT
        && elapsed_millis < interval_millis(session.session_expiry_interval())
}

/// The instant a session written at `timestamp` expires, for audit records
#[inline]
pub fn expires_at(session: &ClientSession, timestamp: Timestamp) -> Timestamp {
    timestamp.saturating_add_secs(session.session_expiry_interval())
}
