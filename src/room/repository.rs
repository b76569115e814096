use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::models::{NewRoom, RoomDetails, RoomModel, RoomWithMembers, UserModel, UserSummary};
use super::types::RoomFilter;
use crate::shared::AppError;

/// Trait for room repository operations
///
/// Every mutation names an existing room. A missing room (or user, for
/// membership changes) is reported as `AppError::Database`, never ignored.
#[async_trait]
pub trait RoomRepository {
    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomModel>, AppError>;
    async fn get_room(&self, room_id: i64) -> Result<Option<RoomModel>, AppError>;

    /// The room `room_id`, but only while `member_id` is in its member set
    async fn find_room_with_member(
        &self,
        room_id: i64,
        member_id: i64,
    ) -> Result<Option<RoomModel>, AppError>;

    /// Inserts the room and returns it shaped with host, members and messages
    async fn create_room(&self, room: NewRoom) -> Result<RoomDetails, AppError>;

    /// Adds `user_id` to the member set; adding an existing member is not an error
    async fn add_member(&self, room_id: i64, user_id: i64) -> Result<RoomWithMembers, AppError>;

    /// Removes `user_id` from the member set; removing a non-member is not an error
    async fn remove_member(&self, room_id: i64, user_id: i64) -> Result<RoomModel, AppError>;

    async fn delete_room(&self, room_id: i64) -> Result<(), AppError>;
}

fn room_not_found(room_id: i64) -> AppError {
    AppError::Database(format!("Room {} not found", room_id))
}

fn user_not_found(user_id: i64) -> AppError {
    AppError::Database(format!("User {} not found", user_id))
}

#[derive(Debug)]
struct StoredRoom {
    room: RoomModel,
    member_ids: BTreeSet<i64>,
}

#[derive(Debug, Default)]
struct Store {
    last_room_id: i64,
    rooms: BTreeMap<i64, StoredRoom>,
    users: BTreeMap<i64, UserModel>,
}

impl Store {
    fn user(&self, user_id: i64) -> Result<&UserModel, AppError> {
        self.users.get(&user_id).ok_or_else(|| user_not_found(user_id))
    }
}

/// In-memory implementation of RoomRepository for development and testing
///
/// Data is stored in memory and will be lost when the application restarts.
/// Rooms are listed in id order.
#[derive(Debug, Default)]
pub struct InMemoryRoomRepository {
    store: RwLock<Store>,
}

impl InMemoryRoomRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory repository with pre-populated users
    pub fn with_users(users: Vec<UserModel>) -> Self {
        let store = Store {
            users: users.into_iter().map(|user| (user.id, user)).collect(),
            ..Store::default()
        };

        Self {
            store: RwLock::new(store),
        }
    }

    /// Current member ids of a room, or None if the room doesn't exist
    pub async fn member_ids(&self, room_id: i64) -> Option<Vec<i64>> {
        let store = self.store.read().await;
        store
            .rooms
            .get(&room_id)
            .map(|stored| stored.member_ids.iter().copied().collect())
    }

    pub async fn room_count(&self) -> usize {
        self.store.read().await.rooms.len()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self))]
    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomModel>, AppError> {
        let store = self.store.read().await;
        let rooms = store.rooms.values().map(|stored| &stored.room);

        let listed: Vec<RoomModel> = match filter {
            RoomFilter::All => rooms.cloned().collect(),
            RoomFilter::HostedBy(host_id) => rooms
                .filter(|room| room.is_hosted_by(*host_id))
                .cloned()
                .collect(),
            RoomFilter::Search(text) => rooms
                .filter(|room| room.matches_search(text))
                .cloned()
                .collect(),
            RoomFilter::Nothing => Vec::new(),
        };

        debug!(room_count = listed.len(), "Rooms listed from memory");
        Ok(listed)
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: i64) -> Result<Option<RoomModel>, AppError> {
        let store = self.store.read().await;
        let room = store.rooms.get(&room_id).map(|stored| stored.room.clone());

        match &room {
            Some(r) => debug!(room_id, room_name = %r.room_name, "Room found in memory"),
            None => debug!(room_id, "Room not found in memory"),
        }

        Ok(room)
    }

    #[instrument(skip(self))]
    async fn find_room_with_member(
        &self,
        room_id: i64,
        member_id: i64,
    ) -> Result<Option<RoomModel>, AppError> {
        let store = self.store.read().await;
        Ok(store
            .rooms
            .get(&room_id)
            .filter(|stored| stored.member_ids.contains(&member_id))
            .map(|stored| stored.room.clone()))
    }

    #[instrument(skip(self, room), fields(room_name = %room.room_name, host_id = room.host_id))]
    async fn create_room(&self, room: NewRoom) -> Result<RoomDetails, AppError> {
        let mut store = self.store.write().await;

        let host = match store.user(room.host_id) {
            Ok(host) => host.summary(),
            Err(e) => {
                warn!(host_id = room.host_id, "Host does not exist, refusing to create room");
                return Err(e);
            }
        };

        store.last_room_id += 1;
        let room = RoomModel {
            id: store.last_room_id,
            room_name: room.room_name,
            description: room.description,
            topics: room.topics,
            host_id: room.host_id,
            created_at: Utc::now(),
        };

        store.rooms.insert(
            room.id,
            StoredRoom {
                room: room.clone(),
                member_ids: BTreeSet::new(),
            },
        );

        debug!(room_id = room.id, "Room created successfully in memory");

        // A new room has neither members nor messages yet
        Ok(RoomDetails {
            room,
            host,
            members: Vec::new(),
            messages: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    async fn add_member(&self, room_id: i64, user_id: i64) -> Result<RoomWithMembers, AppError> {
        let mut store = self.store.write().await;
        store.user(user_id)?;

        let stored = store
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| room_not_found(room_id))?;
        stored.member_ids.insert(user_id);

        let room = stored.room.clone();
        let member_ids: Vec<i64> = stored.member_ids.iter().copied().collect();
        let members = member_ids
            .into_iter()
            .filter_map(|id| store.users.get(&id).cloned())
            .collect::<Vec<_>>();

        info!(room_id, user_id, member_count = members.len(), "Member added in memory");

        Ok(RoomWithMembers { room, members })
    }

    #[instrument(skip(self))]
    async fn remove_member(&self, room_id: i64, user_id: i64) -> Result<RoomModel, AppError> {
        let mut store = self.store.write().await;

        let stored = store
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| room_not_found(room_id))?;

        if !stored.member_ids.remove(&user_id) {
            debug!(room_id, user_id, "User was not a member, nothing to remove");
        }

        Ok(stored.room.clone())
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: i64) -> Result<(), AppError> {
        let mut store = self.store.write().await;

        if store.rooms.remove(&room_id).is_none() {
            warn!(room_id, "Room not found for deletion in memory");
            return Err(room_not_found(room_id));
        }

        debug!(room_id, "Room deleted successfully from memory");
        Ok(())
    }
}

const ROOM_COLUMNS: &str = "id, room_name, description, topics, host_id, created_at";

fn store_error(e: sqlx::Error) -> AppError {
    warn!(error = %e, "Room store query failed");
    AppError::from(e)
}

/// PostgreSQL implementation of room repository
///
/// Schema lives in `migrations/0001_rooms.sql`.
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn members_of(
        conn: &mut sqlx::PgConnection,
        room_id: i64,
    ) -> Result<Vec<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>(
            "SELECT u.id, u.user_name, u.role FROM users u \
             JOIN room_members m ON m.user_id = u.id \
             WHERE m.room_id = $1 ORDER BY u.id",
        )
        .bind(room_id)
        .fetch_all(conn)
        .await
        .map_err(store_error)
    }

    async fn lock_room(
        conn: &mut sqlx::PgConnection,
        room_id: i64,
    ) -> Result<RoomModel, AppError> {
        let query = format!("SELECT {} FROM rooms WHERE id = $1 FOR UPDATE", ROOM_COLUMNS);
        sqlx::query_as::<_, RoomModel>(&query)
            .bind(room_id)
            .fetch_optional(conn)
            .await
            .map_err(store_error)?
            .ok_or_else(|| room_not_found(room_id))
    }
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    #[instrument(skip(self))]
    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomModel>, AppError> {
        let rooms = match filter {
            RoomFilter::All => {
                let query = format!("SELECT {} FROM rooms ORDER BY id", ROOM_COLUMNS);
                sqlx::query_as::<_, RoomModel>(&query)
                    .fetch_all(&self.pool)
                    .await
            }
            RoomFilter::HostedBy(host_id) => {
                let query = format!(
                    "SELECT {} FROM rooms WHERE host_id = $1 ORDER BY id",
                    ROOM_COLUMNS
                );
                sqlx::query_as::<_, RoomModel>(&query)
                    .bind(*host_id)
                    .fetch_all(&self.pool)
                    .await
            }
            RoomFilter::Search(text) => {
                // strpos keeps the match literal, unlike LIKE with user-supplied % or _
                let query = format!(
                    "SELECT {} FROM rooms WHERE strpos(room_name, $1) > 0 OR $1 = ANY(topics) ORDER BY id",
                    ROOM_COLUMNS
                );
                sqlx::query_as::<_, RoomModel>(&query)
                    .bind(text.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            RoomFilter::Nothing => return Ok(Vec::new()),
        }
        .map_err(store_error)?;

        debug!(room_count = rooms.len(), "Rooms listed from database");
        Ok(rooms)
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: i64) -> Result<Option<RoomModel>, AppError> {
        let query = format!("SELECT {} FROM rooms WHERE id = $1", ROOM_COLUMNS);
        sqlx::query_as::<_, RoomModel>(&query)
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    #[instrument(skip(self))]
    async fn find_room_with_member(
        &self,
        room_id: i64,
        member_id: i64,
    ) -> Result<Option<RoomModel>, AppError> {
        let query = format!(
            "SELECT {} FROM rooms r WHERE r.id = $1 AND EXISTS \
             (SELECT 1 FROM room_members m WHERE m.room_id = r.id AND m.user_id = $2)",
            ROOM_COLUMNS
        );
        sqlx::query_as::<_, RoomModel>(&query)
            .bind(room_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)
    }

    #[instrument(skip(self, room), fields(room_name = %room.room_name, host_id = room.host_id))]
    async fn create_room(&self, room: NewRoom) -> Result<RoomDetails, AppError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let insert = format!(
            "INSERT INTO rooms (room_name, description, topics, host_id) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            ROOM_COLUMNS
        );
        let created = sqlx::query_as::<_, RoomModel>(&insert)
            .bind(room.room_name)
            .bind(room.description)
            .bind(room.topics)
            .bind(room.host_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;

        let host = sqlx::query_as::<_, UserSummary>(
            "SELECT id, user_name FROM users WHERE id = $1",
        )
        .bind(created.host_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error)?
        .ok_or_else(|| user_not_found(created.host_id))?;

        tx.commit().await.map_err(store_error)?;

        debug!(room_id = created.id, "Room created successfully in database");

        // A new room has neither members nor messages yet
        Ok(RoomDetails {
            room: created,
            host,
            members: Vec::new(),
            messages: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    async fn add_member(&self, room_id: i64, user_id: i64) -> Result<RoomWithMembers, AppError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let room = Self::lock_room(&mut *tx, room_id).await?;

        // The users foreign key rejects unknown ids
        sqlx::query(
            "INSERT INTO room_members (room_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        let members = Self::members_of(&mut *tx, room_id).await?;
        tx.commit().await.map_err(store_error)?;

        info!(room_id, user_id, member_count = members.len(), "Member added in database");
        Ok(RoomWithMembers { room, members })
    }

    #[instrument(skip(self))]
    async fn remove_member(&self, room_id: i64, user_id: i64) -> Result<RoomModel, AppError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let room = Self::lock_room(&mut *tx, room_id).await?;

        let result = sqlx::query("DELETE FROM room_members WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;

        debug!(
            room_id,
            user_id,
            removed = result.rows_affected(),
            "Member removed in database"
        );
        Ok(room)
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: i64) -> Result<(), AppError> {
        // room_members and messages cascade
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            warn!(room_id, "Room not found for deletion");
            return Err(room_not_found(room_id));
        }

        debug!(room_id, "Room deleted successfully from database");
        Ok(())
    }
}
