//! Event publication to the registered observer.
//!
//! The proxy publishes two notifications: `request-captured` when an
//! intercepted request is recorded (only while interception is enabled), and
//! `response-ready` when the forwarder completes an upstream exchange.
//! Delivery is fire-and-forget: no guarantee, no backpressure.

use crate::capture::{InterceptedRequest, InterceptedResponse};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

/// Notification published to the observer.
#[derive(Debug, Clone)]
pub enum ProxyEvent {
    RequestCaptured(InterceptedRequest),
    ResponseReady {
        request: InterceptedRequest,
        response: InterceptedResponse,
    },
}

/// Single-observer event bus, owned by the proxy instance.
///
/// Registering a new observer replaces the previous one. Publishing with no
/// observer registered, or to an observer whose receiver has been dropped,
/// is silently a no-op.
#[derive(Default)]
pub struct EventBus {
    observer: RwLock<Option<mpsc::UnboundedSender<ProxyEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the observer, returning the receiving half.
    pub fn register(&self) -> mpsc::UnboundedReceiver<ProxyEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.observer.write() = Some(tx);
        rx
    }

    /// Publish an event to the observer, if any.
    pub fn publish(&self, event: ProxyEvent) {
        let observer = self.observer.read();
        if let Some(tx) = observer.as_ref() {
            if tx.send(event).is_err() {
                debug!("event observer dropped; notification discarded");
            }
        }
    }
}
