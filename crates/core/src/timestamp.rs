//! Millisecond-precision timestamp type
//!
//! Every stored session entry records the wall-clock time of its last
//! mutation. Expiry is computed from the difference between "now" and that
//! timestamp, so the representation matches what brokers hand over: signed
//! milliseconds since the Unix epoch.
//!
//! ## Usage
//!
//! Never expose raw arithmetic. Use explicit constructors:
//!
//! ```
//! use session_core::Timestamp;
//!
//! let now = Timestamp::now();
//! let from_secs = Timestamp::from_secs(1000);
//! let from_millis = Timestamp::from_millis(1_000_000);
//! assert_eq!(from_secs, from_millis);
//! assert!(now.is_positive());
//! ```

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond-precision timestamp
///
/// Signed so that callers can hand over values the store has to reject
/// (mutations require a strictly positive timestamp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Maximum representable timestamp
    pub const MAX: Timestamp = Timestamp(i64::MAX);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp for the current moment
    ///
    /// Returns epoch if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
    }

    /// Create a timestamp from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs.saturating_mul(1_000))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get milliseconds since Unix epoch
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Whether this timestamp lies strictly after the epoch
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    /// Milliseconds elapsed between `earlier` and `self`
    ///
    /// Negative when `earlier` is actually later (clock skew between the
    /// writer and the reader). Saturates instead of overflowing.
    #[inline]
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Add a number of seconds, saturating at the numeric bounds
    #[inline]
    pub fn saturating_add_secs(&self, secs: i64) -> Self {
        Timestamp(self.0.saturating_add(secs.saturating_mul(1_000)))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<i64> for Timestamp {
    /// Create from raw milliseconds
    fn from(millis: i64) -> Self {
        Timestamp::from_millis(millis)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
