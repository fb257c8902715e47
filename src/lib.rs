//! Sharded in-memory client session store for MQTT brokers
//!
//! Keeps one record per client identifier: connection state, session expiry
//! interval and an optional last-will message. Records are spread over a
//! fixed number of buckets; each bucket has a single writer at a time while
//! readers proceed concurrently.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use mqtt_session_store::{ClientSession, ClientSessionStore, StoreConfig, Timestamp};
//!
//! let store = ClientSessionStore::new(StoreConfig::default(), payload_store)?;
//!
//! // Client connects with a 30 second session expiry
//! store.put_by_id("sensor-1", ClientSession::new(true, 30), Timestamp::now())?;
//!
//! // Client goes away; the session survives for 30 seconds
//! store.disconnect_by_id("sensor-1", Timestamp::now(), false, None)?;
//! ```
//!
//! # Architecture
//!
//! Domain types and collaborator traits live in `session-core`; the store,
//! its expiry predicate and the background cleaner live in `session-storage`.

pub use session_core::*;
pub use session_storage::*;
