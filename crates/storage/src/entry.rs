//! Storage-layer value wrapper with memory accounting
//!
//! `PersistenceEntry` pairs a stored object with the timestamp of the
//! mutation that produced it and a lazily computed, cached size estimate.
//! Entries are immutable once built: any change to the object produces a new
//! entry, so the cached size never goes stale.

use once_cell::sync::OnceCell;
use session_core::{Sizable, Timestamp};

use session_core::sizable::{LONG_SIZE, OBJECT_SHELL_SIZE, REF_SIZE};

/// A stored object with its last-write timestamp
#[derive(Debug, Clone)]
pub struct PersistenceEntry<T> {
    object: T,
    timestamp: Timestamp,
    estimated_size: OnceCell<usize>,
}

impl<T: Sizable> PersistenceEntry<T> {
    /// Wrap `object`, written at `timestamp`
    pub fn new(object: T, timestamp: Timestamp) -> Self {
        Self {
            object,
            timestamp,
            estimated_size: OnceCell::new(),
        }
    }

    /// The wrapped object
    #[inline]
    pub fn object(&self) -> &T {
        &self.object
    }

    /// Time of the mutation that produced this entry
    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Estimated memory footprint of the entry, object included
    ///
    /// Computed on first call and cached.
    pub fn estimated_size(&self) -> usize {
        *self.estimated_size.get_or_init(|| {
            OBJECT_SHELL_SIZE + LONG_SIZE + REF_SIZE + self.object.estimated_size()
        })
    }
}

impl<T: Sizable + PartialEq> PartialEq for PersistenceEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.object == other.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted<'a> {
        calls: &'a AtomicUsize,
        size: usize,
    }

    impl Sizable for Counted<'_> {
        fn estimated_size(&self) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.size
        }
    }

    #[test]
    fn test_entry_accessors() {
        let calls = AtomicUsize::new(0);
        let entry = PersistenceEntry::new(Counted { calls: &calls, size: 10 }, Timestamp::from_millis(5));
        assert_eq!(entry.timestamp(), Timestamp::from_millis(5));
        assert_eq!(entry.object().size, 10);
    }

    #[test]
    fn test_size_is_computed_once() {
        let calls = AtomicUsize::new(0);
        let entry = PersistenceEntry::new(Counted { calls: &calls, size: 100 }, Timestamp::from_millis(1));

        let first = entry.estimated_size();
        let second = entry.estimated_size();

        assert_eq!(first, second);
        assert_eq!(first, OBJECT_SHELL_SIZE + LONG_SIZE + REF_SIZE + 100);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_size_is_lazy() {
        let calls = AtomicUsize::new(0);
        let _entry = PersistenceEntry::new(Counted { calls: &calls, size: 1 }, Timestamp::from_millis(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
