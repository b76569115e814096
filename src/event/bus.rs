use tokio::sync::broadcast;
use tracing::debug;

use super::events::RoomEvent;

/// Event bus for distributing room events throughout the application
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RoomEvent>,
}

impl EventBus {
    /// Creates a new event bus; slow subscribers lag once `capacity` events are queued
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emits an event to all current subscribers, returning how many received it
    pub fn emit(&self, event: RoomEvent) -> usize {
        let attachment = event.attachment().to_string();
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    attachment = %attachment,
                    receivers = receiver_count,
                    "Room event emitted"
                );
                receiver_count
            }
            Err(_) => {
                debug!(attachment = %attachment, "Room event emitted with no receivers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }
}
