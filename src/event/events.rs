use serde::{Deserialize, Serialize};

/// Events that happen to rooms
///
/// Events represent facts about things that have already happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RoomEvent {
    /// A room was created; `payload` is the serialized room with host, members and messages
    RoomCreated { attachment: String, payload: String },
}

impl RoomEvent {
    /// The `room-<id>` reference the event is about
    pub fn attachment(&self) -> &str {
        match self {
            RoomEvent::RoomCreated { attachment, .. } => attachment,
        }
    }
}
