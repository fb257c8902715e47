//! Session expiry background task
//!
//! This module provides SessionCleaner that runs in a background thread
//! and periodically sweeps every bucket with `ClientSessionStore::clean_up`.
//!
//! # Design Notes
//!
//! - Goes through `clean_up`, so counters and will references stay paired
//! - One bucket at a time; writers of other buckets are never blocked
//! - Graceful shutdown via atomic flag
//! - Configurable check interval

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::{ClientSessionStore, StoreConfig};

/// Background session expiry task
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use session_storage::{ClientSessionStore, SessionCleaner, StoreConfig};
///
/// let store = Arc::new(store);
/// let cleaner = SessionCleaner::from_config(Arc::clone(&store), &config);
/// let handle = cleaner.start();
///
/// // ... use the store ...
///
/// cleaner.shutdown();
/// handle.join().unwrap();
/// ```
pub struct SessionCleaner {
    /// Store to sweep
    store: Arc<ClientSessionStore>,
    /// How often to sweep
    check_interval: Duration,
    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl SessionCleaner {
    /// Create a new cleaner for `store`
    pub fn new(store: Arc<ClientSessionStore>, check_interval: Duration) -> Self {
        Self {
            store,
            check_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a cleaner sweeping every `config.cleanup_interval`
    pub fn from_config(store: Arc<ClientSessionStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.cleanup_interval)
    }

    /// How often the cleaner sweeps
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Sweep every bucket once and return the number of removed sessions
    pub fn sweep(store: &ClientSessionStore) -> usize {
        let mut removed = 0;
        for bucket in 0..store.bucket_count() {
            match store.clean_up(bucket) {
                Ok(expired) => removed += expired.len(),
                Err(e) => error!(bucket, error = %e, "Session cleanup failed"),
            }
        }
        removed
    }

    /// Start the background cleanup task
    ///
    /// The thread runs until `shutdown()` is called.
    pub fn start(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let shutdown = Arc::clone(&self.shutdown);
        let check_interval = self.check_interval;

        info!(interval_ms = check_interval.as_millis() as u64, "Session cleaner started");

        thread::spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                // Sleep in short steps so shutdown is noticed promptly
                let sleep_interval = Duration::from_millis(100).min(check_interval);
                let mut elapsed = Duration::ZERO;

                while elapsed < check_interval {
                    if shutdown.load(Ordering::Relaxed) {
                        info!("Session cleaner stopped");
                        return;
                    }
                    thread::sleep(sleep_interval);
                    elapsed += sleep_interval;
                }

                Self::sweep(&store);
            }
            info!("Session cleaner stopped");
        })
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
