//! Client identifier to bucket routing
//!
//! A client identifier maps to exactly one bucket for the lifetime of the
//! store, so no operation ever has to coordinate across buckets.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Bucket a client identifier belongs to
///
/// Deterministic across processes (FxHash has no random seed) and spreads
/// identifiers uniformly over `bucket_count` buckets.
///
/// Always 0 when `bucket_count` is zero; store configuration rejects that.
#[inline]
pub fn bucket_index(client_id: &str, bucket_count: usize) -> usize {
    let mut hasher = FxHasher::default();
    hasher.write(client_id.as_bytes());
    // Range-reduce with the high bits; FxHash mixes those best.
    ((u128::from(hasher.finish()) * bucket_count as u128) >> 64) as usize
}
