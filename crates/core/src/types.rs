//! Result types returned by bucket-scoped queries

use serde::{Deserialize, Serialize};

/// A will waiting to be published for a disconnected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingWill {
    /// Seconds after disconnect at which the will is due:
    /// the smaller of the will delay and the session expiry
    pub delay_interval: i64,
    /// The delay the client originally requested for its will
    pub original_delay_interval: i64,
}

impl PendingWill {
    /// Create a pending will entry
    pub fn new(delay_interval: i64, original_delay_interval: i64) -> Self {
        Self {
            delay_interval,
            original_delay_interval,
        }
    }
}

/// One chunk of a bucket iteration
///
/// Page-oriented backends hand out a bucket in several chunks and use
/// `last_key` to resume; the in-memory store always returns a single,
/// finished chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketChunk<T> {
    /// Items of this chunk
    pub items: T,
    /// True when no further chunk exists for this bucket
    pub finished: bool,
    /// Cursor to resume from, if not finished
    pub last_key: Option<String>,
    /// Bucket the chunk was read from
    pub bucket_index: usize,
}

impl<T> BucketChunk<T> {
    /// A chunk that covers the whole bucket
    pub fn complete(items: T, bucket_index: usize) -> Self {
        Self {
            items,
            finished: true,
            last_key: None,
            bucket_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_chunk() {
        let chunk = BucketChunk::complete(vec![1, 2, 3], 4);
        assert!(chunk.finished);
        assert!(chunk.last_key.is_none());
        assert_eq!(chunk.bucket_index, 4);
        assert_eq!(chunk.items.len(), 3);
    }

    #[test]
    fn test_pending_will() {
        let pending = PendingWill::new(5, 60);
        assert_eq!(pending.delay_interval, 5);
        assert_eq!(pending.original_delay_interval, 60);
    }
}
