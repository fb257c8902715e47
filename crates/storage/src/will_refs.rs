//! Will payload reference bookkeeping
//!
//! Every will stored in a session holds exactly one reference in the
//! payload store. `WillReferences` is the only place that releases those
//! references and the only place that resolves payload bytes, so the
//! store's mutation paths never talk to the payload store directly.

use std::sync::Arc;

use session_core::{ClientSession, PayloadStore};
use tracing::warn;

/// Mediates between session wills and the payload store
#[derive(Clone)]
pub struct WillReferences {
    payloads: Arc<dyn PayloadStore>,
}

impl WillReferences {
    /// Create a manager backed by `payloads`
    pub fn new(payloads: Arc<dyn PayloadStore>) -> Self {
        Self { payloads }
    }

    /// Release the reference held by the session's will, if any
    ///
    /// Must be called exactly once for every will that leaves the store,
    /// whether it is replaced, cleared or removed with its session.
    pub fn release(&self, session: &ClientSession) {
        if let Some(will) = session.will() {
            self.payloads.decrement_reference_count(will.payload_id());
        }
    }

    /// Resolve the will payload into the session if it is not resident yet
    ///
    /// A payload that is gone from the payload store means the will can no
    /// longer be published: the will is dropped from `session` and a warning
    /// is logged. Returns `false` in that case.
    pub fn attach_payload_if_missing(&self, session: &mut ClientSession) -> bool {
        self.check_payload(session, true)
    }

    /// Drop the will from `session` if its payload no longer exists
    ///
    /// Like [`attach_payload_if_missing`](Self::attach_payload_if_missing)
    /// but leaves the session without resident bytes.
    pub fn drop_dangling(&self, session: &mut ClientSession) -> bool {
        self.check_payload(session, false)
    }

    fn check_payload(&self, session: &mut ClientSession, attach: bool) -> bool {
        let Some(will) = session.will_mut() else {
            return true;
        };
        if will.payload().is_some() {
            return true;
        }
        let payload_id = will.payload_id();
        match self.payloads.get_payload_or_null(payload_id) {
            Some(payload) => {
                if attach {
                    will.set_payload(payload);
                }
                true
            }
            None => {
                warn!(payload_id, "Will payload not found");
                session.take_will();
                false
            }
        }
    }
}

impl std::fmt::Debug for WillReferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WillReferences").finish_non_exhaustive()
    }
}
