use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::events::RoomEvent;
use crate::shared::{AppError, AppState};

/// What the create-room step hands to the next handler
#[derive(Debug, Clone)]
pub struct RoomAttachment {
    /// `room-<id>`
    pub attachment: String,
    /// The created room serialized as JSON
    pub obj: String,
}

impl RoomAttachment {
    pub fn for_room(room_id: i64, obj: String) -> Self {
        Self {
            attachment: format!("room-{}", room_id),
            obj,
        }
    }
}

/// Continuation of POST /rooms
///
/// Runs only after the room has been stored. Publishes the new room on the
/// event bus and answers the original request.
#[instrument(name = "announce_room_created", skip(state, attachment), fields(attachment = %attachment.attachment))]
pub async fn announce_room_created(
    State(state): State<AppState>,
    Extension(attachment): Extension<RoomAttachment>,
) -> Result<Json<Value>, AppError> {
    let room: Value = serde_json::from_str(&attachment.obj).map_err(|e| {
        warn!(error = %e, "Room attachment is not valid JSON");
        AppError::Internal
    })?;

    let receivers = state.event_bus.emit(RoomEvent::RoomCreated {
        attachment: attachment.attachment.clone(),
        payload: attachment.obj,
    });

    info!(receivers, "Room creation announced");

    Ok(Json(json!({
        "attachment": attachment.attachment,
        "room": room,
    })))
}
