//! Storage layer for MQTT client sessions
//!
//! This crate implements the in-memory session store with:
//! - ClientSessionStore: fixed array of DashMap buckets, one writer per bucket
//! - PersistenceEntry: stored value with timestamp and cached size estimate
//! - Expiry predicate for disconnected sessions
//! - WillReferences: pairing of stored wills with payload store references
//! - SessionCleaner: background expiry sweep
//!
//! # Counters
//!
//! The live-session count and the memory estimate are maintained
//! incrementally on every mutation; they are O(1) to read.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleaner;
pub mod config;
pub mod entry;
pub mod expiry;
pub mod sharded;
pub mod testing;
pub mod will_refs;

pub use cleaner::SessionCleaner;
pub use config::{ConfigError, StoreConfig};
pub use entry::PersistenceEntry;
pub use expiry::is_expired;
pub use sharded::{Bucket, ClientSessionStore};
pub use will_refs::WillReferences;
