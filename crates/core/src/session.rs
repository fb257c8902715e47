//! Client session records
//!
//! A `ClientSession` is the per-client state the broker keeps between
//! connections: whether the client is connected, how long the session
//! survives a disconnect, and an optional last will.
//!
//! ## Persistence
//!
//! A session is *persistent* when its expiry interval is greater than
//! [`SESSION_EXPIRE_ON_DISCONNECT`]. Persistence is a property of the
//! interval alone; connection state does not enter into it.
//!
//! A disconnected, non-persistent session is a *tombstone*: it only exists to
//! remember when the client went away and answers "no session" to callers.

use serde::{Deserialize, Serialize};

use crate::sizable::{Sizable, BOOL_SIZE, LONG_SIZE, OBJECT_SHELL_SIZE, REF_SIZE};
use crate::will::ClientSessionWill;

/// Expiry interval meaning "discard the session as soon as the client disconnects"
pub const SESSION_EXPIRE_ON_DISCONNECT: i64 = 0;

/// Largest expiry interval a client may request (MQTT 5 four-byte integer)
pub const SESSION_EXPIRY_MAX: i64 = u32::MAX as i64;

/// State of one client's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSession {
    connected: bool,
    session_expiry_interval: i64,
    will: Option<ClientSessionWill>,
}

impl ClientSession {
    /// Create a session without a will
    pub fn new(connected: bool, session_expiry_interval: i64) -> Self {
        Self {
            connected,
            session_expiry_interval,
            will: None,
        }
    }

    /// Create a session carrying a will
    pub fn with_will(connected: bool, session_expiry_interval: i64, will: ClientSessionWill) -> Self {
        Self {
            connected,
            session_expiry_interval,
            will: Some(will),
        }
    }

    /// Whether the client is currently connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Update the connection flag
    #[inline]
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Session expiry interval in seconds
    #[inline]
    pub fn session_expiry_interval(&self) -> i64 {
        self.session_expiry_interval
    }

    /// Replace the session expiry interval
    #[inline]
    pub fn set_session_expiry_interval(&mut self, interval: i64) {
        self.session_expiry_interval = interval;
    }

    /// The attached will, if any
    #[inline]
    pub fn will(&self) -> Option<&ClientSessionWill> {
        self.will.as_ref()
    }

    /// Mutable access to the attached will
    #[inline]
    pub fn will_mut(&mut self) -> Option<&mut ClientSessionWill> {
        self.will.as_mut()
    }

    /// Detach and return the will
    ///
    /// The caller becomes responsible for the payload reference it holds.
    pub fn take_will(&mut self) -> Option<ClientSessionWill> {
        self.will.take()
    }

    /// Whether the session survives a disconnect
    #[inline]
    pub fn is_persistent(&self) -> bool {
        self.session_expiry_interval > SESSION_EXPIRE_ON_DISCONNECT
    }

    /// Whether the session counts toward the live-session total
    #[inline]
    pub fn counts_as_session(&self) -> bool {
        self.connected || self.is_persistent()
    }

    /// Whether this record is a tombstone (disconnected and not persistent)
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        !self.counts_as_session()
    }

    /// Clone without the will
    pub fn copy_without_will(&self) -> Self {
        Self {
            connected: self.connected,
            session_expiry_interval: self.session_expiry_interval,
            will: None,
        }
    }

    /// Clone with the will kept but its payload bytes stripped
    pub fn deep_copy_without_payload(&self) -> Self {
        Self {
            connected: self.connected,
            session_expiry_interval: self.session_expiry_interval,
            will: self.will.as_ref().map(ClientSessionWill::copy_without_payload),
        }
    }
}

impl Sizable for ClientSession {
    fn estimated_size(&self) -> usize {
        let mut size = OBJECT_SHELL_SIZE;
        size += BOOL_SIZE; // connected
        size += LONG_SIZE; // expiry
        size += REF_SIZE; // will
        if let Some(will) = &self.will {
            size += will.estimated_size();
        }
        size
    }
}
