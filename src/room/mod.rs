// Public API - what other modules can use
pub use handlers::{create_room, delete_room, join_room, leave_room, list_rooms, remove_member};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
