// Library crate for the chat room service
// This file exposes the public API and the router for integration tests

pub mod config;
pub mod event;
pub mod room;
pub mod session;
pub mod shared;
pub mod validation;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use event::{EventBus, RoomEvent};
pub use room::{
    models::RoomModel,
    repository::{InMemoryRoomRepository, PostgresRoomRepository, RoomRepository},
};
pub use session::{CurrentUser, Role, TokenConfig};
pub use shared::{AppError, AppState};

/// Builds the HTTP router
///
/// Listing rooms is public; every other route needs a bearer token.
pub fn app(state: AppState) -> Router {
    // Room creation stores the room, then hands the request to the announcer
    let create_room = post(event::announce_room_created).layer(
        middleware::from_fn_with_state(state.clone(), room::create_room),
    );

    let protected = Router::new()
        .route("/rooms", create_room)
        .route("/rooms", delete(room::delete_room))
        .route("/rooms/join", post(room::join_room))
        .route("/rooms/leave", post(room::leave_room))
        .route("/rooms/members/remove", post(room::remove_member))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::jwt_auth,
        ));

    Router::new()
        .route("/rooms", get(room::list_rooms))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
