//! Push channel carrying debate events from the orchestrator to the caller.
//!
//! The channel is unbounded: a slow consumer buffers, it never drops events.
//! The receiver side doubles as the abort signal. When the caller drops the
//! `EventStream`, `emit` starts returning false and `is_closed` flips, which
//! the orchestrator checks at step boundaries to stop issuing backend calls.

use tokio::sync::mpsc;
use tracing::debug;

use crate::events::types::DebateEvent;

/// Sending half owned by the orchestrator's caller and lent to the run.
#[derive(Debug, Clone)]
pub struct EventChannel {
    sender: mpsc::UnboundedSender<DebateEvent>,
}

/// Receiving half consumed by the caller.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<DebateEvent>,
}

impl EventChannel {
    /// Create a connected channel/stream pair.
    pub fn new() -> (EventChannel, EventStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (EventChannel { sender }, EventStream { receiver })
    }

    /// Push an event to the caller.
    ///
    /// Returns false when the stream has been dropped; the event is discarded.
    pub fn emit(&self, event: DebateEvent) -> bool {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!(event_type, "event dropped, stream receiver is gone");
                false
            }
        }
    }

    /// Whether the caller has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// End the stream. The receiver sees the remaining buffered events and
    /// then `None`.
    pub fn close(self) {
        drop(self);
    }
}

impl EventStream {
    /// Receive the next event; `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<DebateEvent> {
        self.receiver.recv().await
    }
}
