use tokio::sync::broadcast;

use crate::dto::event::SessionEvent;

/// Fan-out hub carrying one session's events to any number of subscribers.
///
/// Cloning is cheap; all clones feed the same channel.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventHub {
    /// Construct a hub backed by a Tokio broadcast channel with the given
    /// capacity.
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub(crate) fn broadcast(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}
