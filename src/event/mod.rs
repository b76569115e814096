// Event components
//
// Broadcasts room lifecycle events to whoever is listening (e.g. real-time
// subscribers) and hosts the continuation that runs after a room is created.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::RoomEvent;
pub use handlers::{announce_room_created, RoomAttachment};

// Internal modules
mod bus;
mod events;
mod handlers;
