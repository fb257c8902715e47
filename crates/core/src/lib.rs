//! Core types and traits for the MQTT client session store
//!
//! This crate defines the foundational types used throughout the system:
//! - Timestamp: millisecond wall-clock time of a mutation
//! - ClientSession: per-client connection, expiry and will state
//! - ClientSessionWill / WillPublish: last-will metadata and payload reference
//! - PendingWill, BucketChunk: results of bucket-scoped queries
//! - Sizable: in-memory size estimation
//! - Traits: collaborator contracts (PayloadStore, EventLog, Clock)
//! - Router: client identifier to bucket mapping
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod router;
pub mod session;
pub mod sizable;
pub mod timestamp;
pub mod traits;
pub mod types;
pub mod will;

pub use error::{Error, Result};
pub use router::bucket_index;
pub use session::{ClientSession, SESSION_EXPIRE_ON_DISCONNECT, SESSION_EXPIRY_MAX};
pub use sizable::Sizable;
pub use timestamp::Timestamp;
pub use traits::{Clock, EventLog, NoopEventLog, PayloadStore, SystemClock};
pub use types::{BucketChunk, PendingWill};
pub use will::{ClientSessionWill, PayloadFormatIndicator, QoS, UserProperty, WillPublish};
