//! Registry of requests held for manual resolution.
//!
//! Each held request parks its connection task on a oneshot receiver; the
//! matching sender lives in this table, keyed by correlation id. Resolution
//! removes the entry and fires the sender in a single locked step, so an id
//! resolves at most once and a second attempt is a harmless no-op.

use crate::capture::SubstituteResponse;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Default)]
pub struct PendingRegistry {
    entries: Mutex<HashMap<String, oneshot::Sender<SubstituteResponse>>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a request: returns the receiver its connection task awaits.
    /// There is no timeout; the entry lives until resolved.
    pub fn register(&self, request_id: String) -> oneshot::Receiver<SubstituteResponse> {
        let (tx, rx) = oneshot::channel();
        self.entries.lock().insert(request_id, tx);
        rx
    }

    /// Resolve a held request with a substitute reply.
    ///
    /// Returns true if an entry existed and the reply was delivered. An
    /// unknown id (never held, or already resolved) returns false without
    /// side effects.
    pub fn resolve(&self, request_id: &str, response: SubstituteResponse) -> bool {
        // Remove-then-send under one lock acquisition; no suspension point
        // between the existence check and the removal.
        let sender = self.entries.lock().remove(request_id);
        match sender {
            Some(tx) => {
                debug!(request_id, "resolving held request");
                // The receiver only disappears if the connection task was
                // torn down; the entry is gone either way.
                tx.send(response).is_ok()
            }
            None => {
                debug!(request_id, "no pending entry for id; ignoring");
                false
            }
        }
    }

    /// Drop a held entry without replying (connection ended while held).
    pub fn discard(&self, request_id: &str) {
        self.entries.lock().remove(request_id);
    }

    /// Ids currently held, in no particular order.
    pub fn pending_ids(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.entries.lock().contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
