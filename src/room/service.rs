use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{parse_topics, NewRoom, RoomDetails, RoomModel, RoomWithMembers},
    repository::RoomRepository,
    types::RoomFilter,
};
use crate::{session::CurrentUser, shared::AppError};

/// Input for creating a room, already checked for required fields
#[derive(Debug, Clone)]
pub struct CreateRoom {
    pub room_name: String,
    /// Raw comma-separated topic list
    pub topics: String,
    pub description: Option<String>,
}

/// Service for handling room business logic
///
/// Every operation takes the caller explicitly; nothing is read from ambient state.
pub struct RoomService {
    repository: Arc<dyn RoomRepository + Send + Sync>,
}

impl RoomService {
    pub fn new(repository: Arc<dyn RoomRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn list_rooms(&self, filter: RoomFilter) -> Result<Vec<RoomModel>, AppError> {
        let rooms = self.repository.list_rooms(&filter).await?;
        debug!(room_count = rooms.len(), "Rooms retrieved successfully");
        Ok(rooms)
    }

    /// Host or any elevated role may delete
    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn delete_room(&self, caller: &CurrentUser, room_id: i64) -> Result<(), AppError> {
        let room = self
            .repository
            .get_room(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Room Doesn't Exist!".to_string()))?;

        if !room.is_hosted_by(caller.id) && !caller.role.is_elevated() {
            warn!(
                room_id,
                host_id = room.host_id,
                role = %caller.role,
                "Caller may not delete this room"
            );
            return Err(AppError::Forbidden(
                "Only Admin can perform this action!".to_string(),
            ));
        }

        self.repository.delete_room(room_id).await?;

        info!(room_id, "Room deleted");
        Ok(())
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn create_room(
        &self,
        caller: &CurrentUser,
        request: CreateRoom,
    ) -> Result<RoomDetails, AppError> {
        let topics = parse_topics(&request.topics);
        debug!(?topics, "Parsed topics");

        let details = self
            .repository
            .create_room(NewRoom {
                room_name: request.room_name,
                description: request.description,
                topics,
                host_id: caller.id,
            })
            .await?;

        info!(
            room_id = details.room.id,
            room_name = %details.room.room_name,
            "Room created successfully"
        );

        Ok(details)
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn join_room(
        &self,
        caller: &CurrentUser,
        room_id: i64,
    ) -> Result<RoomWithMembers, AppError> {
        let room = self.repository.add_member(room_id, caller.id).await?;
        info!(room_id, member_count = room.members.len(), "Joined room");
        Ok(room)
    }

    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn leave_room(&self, caller: &CurrentUser, room_id: i64) -> Result<RoomModel, AppError> {
        let room = self.repository.remove_member(room_id, caller.id).await?;
        info!(room_id, "Left room");
        Ok(room)
    }

    /// Only the host may remove members
    #[instrument(skip(self, caller), fields(caller_id = caller.id))]
    pub async fn remove_member(
        &self,
        caller: &CurrentUser,
        room_id: i64,
        member_id: i64,
    ) -> Result<RoomModel, AppError> {
        let room = self
            .repository
            .find_room_with_member(room_id, member_id)
            .await?
            .ok_or_else(|| AppError::NotFound("room not found!".to_string()))?;

        if !room.is_hosted_by(caller.id) {
            warn!(room_id, host_id = room.host_id, "Non-host tried to remove a member");
            return Err(AppError::Forbidden(
                "you cannot remove any member!".to_string(),
            ));
        }

        let updated = self.repository.remove_member(room.id, member_id).await?;

        info!(room_id, member_id, "Member removed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::repository::InMemoryRoomRepository;
    use crate::shared::test_utils::{admin, seeded_repository, user};

    fn setup() -> (Arc<InMemoryRoomRepository>, RoomService) {
        let repo = Arc::new(seeded_repository());
        let service = RoomService::new(repo.clone());
        (repo, service)
    }

    fn chess_club() -> CreateRoom {
        CreateRoom {
            room_name: "Chess Club".to_string(),
            topics: "chess,strategy".to_string(),
            description: Some("Weekly games".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_room_sets_host_and_topics() {
        let (_, service) = setup();
        let alice = user(1, "alice");

        let details = service.create_room(&alice, chess_club()).await.unwrap();

        assert_eq!(details.room.host_id, 1);
        assert_eq!(details.room.topics, vec!["chess", "strategy"]);
        assert_eq!(details.room.description.as_deref(), Some("Weekly games"));
        assert_eq!(details.host.user_name, "alice");
    }

    #[tokio::test]
    async fn test_create_room_strips_whitespace_in_topics() {
        let (_, service) = setup();
        let request = CreateRoom {
            topics: "a, b ,c".to_string(),
            ..chess_club()
        };

        let details = service
            .create_room(&user(1, "alice"), request)
            .await
            .unwrap();
        assert_eq!(details.room.topics, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_room_by_host() {
        let (repo, service) = setup();
        let alice = user(1, "alice");
        let room = service.create_room(&alice, chess_club()).await.unwrap().room;

        service.delete_room(&alice, room.id).await.unwrap();
        assert_eq!(repo.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_room_by_admin() {
        let (repo, service) = setup();
        let room = service
            .create_room(&user(1, "alice"), chess_club())
            .await
            .unwrap()
            .room;

        service.delete_room(&admin(9, "root"), room.id).await.unwrap();
        assert_eq!(repo.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_room_by_other_user_is_forbidden() {
        let (repo, service) = setup();
        let room = service
            .create_room(&user(1, "alice"), chess_club())
            .await
            .unwrap()
            .room;

        let result = service.delete_room(&user(2, "bob"), room.id).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(repo.get_room(room.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_room() {
        let (_, service) = setup();
        let result = service.delete_room(&admin(9, "root"), 404).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_join_then_leave_restores_membership() {
        let (repo, service) = setup();
        let room = service
            .create_room(&user(1, "alice"), chess_club())
            .await
            .unwrap()
            .room;
        let bob = user(2, "bob");

        let joined = service.join_room(&bob, room.id).await.unwrap();
        assert_eq!(joined.members[0].id, 2);

        service.leave_room(&bob, room.id).await.unwrap();
        assert_eq!(repo.member_ids(room.id).await, Some(vec![]));
    }

    #[tokio::test]
    async fn test_join_missing_room_is_a_store_error() {
        let (_, service) = setup();
        let result = service.join_room(&user(2, "bob"), 77).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_remove_member_by_host() {
        let (repo, service) = setup();
        let alice = user(1, "alice");
        let room = service.create_room(&alice, chess_club()).await.unwrap().room;
        service.join_room(&user(2, "bob"), room.id).await.unwrap();
        service.join_room(&user(3, "carol"), room.id).await.unwrap();

        let updated = service.remove_member(&alice, room.id, 2).await.unwrap();

        assert_eq!(updated.id, room.id);
        assert_eq!(repo.member_ids(room.id).await, Some(vec![3]));
    }

    #[tokio::test]
    async fn test_remove_member_by_non_host_does_not_mutate() {
        let (repo, service) = setup();
        let room = service
            .create_room(&user(1, "alice"), chess_club())
            .await
            .unwrap()
            .room;
        service.join_room(&user(2, "bob"), room.id).await.unwrap();
        service.join_room(&user(3, "carol"), room.id).await.unwrap();

        // Even an admin is not the host
        for caller in [user(3, "carol"), admin(9, "root")] {
            let result = service.remove_member(&caller, room.id, 2).await;
            assert!(matches!(result, Err(AppError::Forbidden(_))));
        }

        assert_eq!(repo.member_ids(room.id).await, Some(vec![2, 3]));
    }

    #[tokio::test]
    async fn test_remove_non_member_is_not_found() {
        let (_, service) = setup();
        let alice = user(1, "alice");
        let room = service.create_room(&alice, chess_club()).await.unwrap().room;

        let result = service.remove_member(&alice, room.id, 2).await;
        assert!(matches!(result, Err(AppError::NotFound(ref m)) if m == "room not found!"));
    }

    #[tokio::test]
    async fn test_list_rooms_by_search() {
        let (_, service) = setup();
        service
            .create_room(&user(1, "alice"), chess_club())
            .await
            .unwrap();

        let by_topic = service
            .list_rooms(RoomFilter::Search("strategy".to_string()))
            .await
            .unwrap();
        assert_eq!(by_topic.len(), 1);

        let partial_topic = service
            .list_rooms(RoomFilter::Search("strat".to_string()))
            .await
            .unwrap();
        assert!(partial_topic.is_empty());
    }
}
