use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    service::{CreateRoom, RoomService},
    types::{
        CreateRoomQuery, JoinRoomResponse, LeaveRoomResponse, ListRoomsQuery, MessageResponse,
        RemoveMemberResponse, RoomFilter, RoomListResponse,
    },
};
use crate::{
    event::RoomAttachment,
    session::CurrentUser,
    shared::{AppError, AppState},
    validation::{self, JsonBody},
};

/// HTTP handler for listing rooms
///
/// GET /rooms?user=<host id>&search=<text>
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(
    State(state): State<AppState>,
    query: Result<Query<ListRoomsQuery>, QueryRejection>,
) -> Result<Json<RoomListResponse>, AppError> {
    let Query(query) = query?;
    let filter = RoomFilter::from(query);

    let service = RoomService::new(Arc::clone(&state.room_repository));
    let rooms = service.list_rooms(filter).await?;

    info!(room_count = rooms.len(), "Rooms listed successfully");

    Ok(Json(RoomListResponse { rooms }))
}

/// HTTP handler for deleting a room
///
/// DELETE /rooms, body `{"roomId": 1}`
#[instrument(name = "delete_room", skip(state, caller, body), fields(caller_id = caller.id))]
pub async fn delete_room(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    JsonBody(body): JsonBody,
) -> Result<Json<MessageResponse>, AppError> {
    if !validation::is_present(body.get("roomId")) {
        return Err(AppError::MissingRoomId);
    }
    let room_id = validation::integer_field(&body, "roomId")?;

    let service = RoomService::new(Arc::clone(&state.room_repository));
    service.delete_room(&caller, room_id).await?;

    Ok(Json(MessageResponse {
        message: "Room deleted Successfully".to_string(),
    }))
}

/// Create-room step of POST /rooms?roomName=..&topics=..&description=..
///
/// Mounted as middleware in front of the continuation handler. On success it
/// does not respond: the new room is attached to the request as a
/// `RoomAttachment` and control passes to `next`.
#[instrument(name = "create_room", skip(state, caller, req, next), fields(caller_id = caller.id))]
pub async fn create_room(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    query: Result<Query<CreateRoomQuery>, QueryRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let room_name = query.room_name.filter(|name| !name.is_empty());
    let topics = query.topics.filter(|topics| !topics.is_empty());
    let (Some(room_name), Some(topics)) = (room_name, topics) else {
        return Err(AppError::MissingKeys);
    };

    let service = RoomService::new(Arc::clone(&state.room_repository));
    let details = service
        .create_room(
            &caller,
            CreateRoom {
                room_name,
                topics,
                description: query.description,
            },
        )
        .await?;

    let obj = serde_json::to_string(&details).map_err(|e| {
        warn!(error = %e, "Failed to serialize created room");
        AppError::Internal
    })?;
    let attachment = RoomAttachment::for_room(details.room.id, obj);

    info!(attachment = %attachment.attachment, "Room created, handing off");

    req.extensions_mut().insert(attachment);
    Ok(next.run(req).await)
}

/// HTTP handler for joining a room
///
/// POST /rooms/join, body `{"roomId": 1}`
#[instrument(name = "join_room", skip(state, caller, body), fields(caller_id = caller.id))]
pub async fn join_room(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    JsonBody(body): JsonBody,
) -> Result<Json<JoinRoomResponse>, AppError> {
    validation::require_fields(&body, &["roomId"])?;
    let room_id = validation::integer_field(&body, "roomId")?;

    let service = RoomService::new(Arc::clone(&state.room_repository));
    let room = service.join_room(&caller, room_id).await?;

    Ok(Json(JoinRoomResponse { room }))
}

/// HTTP handler for leaving a room
///
/// POST /rooms/leave, body `{"roomId": 1}`
#[instrument(name = "leave_room", skip(state, caller, body), fields(caller_id = caller.id))]
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    JsonBody(body): JsonBody,
) -> Result<Json<LeaveRoomResponse>, AppError> {
    validation::require_fields(&body, &["roomId"])?;
    let room_id = validation::integer_field(&body, "roomId")?;

    let service = RoomService::new(Arc::clone(&state.room_repository));
    let room = service.leave_room(&caller, room_id).await?;

    Ok(Json(LeaveRoomResponse { room, user: caller }))
}

/// HTTP handler for a host removing a member
///
/// POST /rooms/members/remove, body `{"roomId": 1, "memberId": 2}`
#[instrument(name = "remove_member", skip(state, caller, body), fields(caller_id = caller.id))]
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    JsonBody(body): JsonBody,
) -> Result<Json<RemoveMemberResponse>, AppError> {
    validation::require_fields(&body, &["roomId", "memberId"])?;
    let room_id = validation::integer_field(&body, "roomId")?;
    let member_id = validation::integer_field(&body, "memberId")?;

    let service = RoomService::new(Arc::clone(&state.room_repository));
    let updated_room = service.remove_member(&caller, room_id, member_id).await?;

    Ok(Json(RemoveMemberResponse { updated_room }))
}
