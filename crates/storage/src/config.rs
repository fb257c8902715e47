//! Session store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use session_core::SESSION_EXPIRY_MAX;

/// Session store configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of buckets (default: 64).
    ///
    /// Fixed for the lifetime of the store; client identifiers are routed
    /// to buckets by hash.
    pub bucket_count: usize,

    /// Expiry interval in seconds given to tombstones created for clients
    /// that disconnect without a stored session (default: MQTT 5 maximum).
    pub default_session_expiry_interval: i64,

    /// How often the background cleaner sweeps all buckets (default: 4s).
    ///
    /// Read by `SessionCleaner::from_config`.
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            bucket_count: 64,
            default_session_expiry_interval: SESSION_EXPIRY_MAX,
            cleanup_interval: Duration::from_secs(4),
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bucket count (builder pattern).
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Set default session expiry interval (builder pattern).
    pub fn with_default_session_expiry_interval(mut self, interval: i64) -> Self {
        self.default_session_expiry_interval = interval;
        self
    }

    /// Set cleanup interval (builder pattern).
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_count == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        if self.default_session_expiry_interval < 0 {
            return Err(ConfigError::NegativeExpiryInterval(
                self.default_session_expiry_interval,
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        Ok(())
    }

    /// Create a configuration suited for tests (few buckets, fast cleanup).
    pub fn for_testing() -> Self {
        StoreConfig {
            bucket_count: 4,
            default_session_expiry_interval: SESSION_EXPIRY_MAX,
            cleanup_interval: Duration::from_millis(50),
        }
    }
}

/// Store configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// At least one bucket is required.
    #[error("Bucket count must be greater than 0")]
    ZeroBuckets,

    /// Expiry intervals are seconds and cannot be negative.
    #[error("Default session expiry interval must not be negative, got {0}")]
    NegativeExpiryInterval(i64),

    /// The cleaner needs a non-zero period.
    #[error("Cleanup interval must be greater than 0")]
    ZeroCleanupInterval,
}
