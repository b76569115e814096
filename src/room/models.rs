use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::session::Role;

/// Database model for rooms table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomModel {
    pub id: i64,
    pub room_name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub host_id: i64,
    pub created_at: DateTime<Utc>,
}

impl RoomModel {
    /// Case-sensitive: name contains `text`, or one topic equals it exactly
    pub fn matches_search(&self, text: &str) -> bool {
        self.room_name.contains(text) || self.topics.iter().any(|topic| topic == text)
    }

    pub fn is_hosted_by(&self, user_id: i64) -> bool {
        self.host_id == user_id
    }
}

/// Values needed to insert a room; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewRoom {
    pub room_name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub host_id: i64,
}

/// Database model for users table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    pub id: i64,
    pub user_name: String,
    pub role: Role,
}

impl UserModel {
    pub fn new(id: i64, user_name: &str, role: Role) -> Self {
        Self {
            id,
            user_name: user_name.to_string(),
            role,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            user_name: self.user_name.clone(),
        }
    }
}

/// The `{id, userName}` projection of a user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub user_name: String,
}

/// Database model for messages table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageModel {
    pub id: i64,
    pub body: String,
    pub user_id: i64,
    pub room_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A room with its host, members and messages, as returned by create room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomDetails {
    #[serde(flatten)]
    pub room: RoomModel,
    pub host: UserSummary,
    pub members: Vec<UserSummary>,
    pub messages: Vec<MessageModel>,
}

/// A room with its full member records, as returned by join room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomWithMembers {
    #[serde(flatten)]
    pub room: RoomModel,
    pub members: Vec<UserModel>,
}

/// Strips every whitespace character, then splits on commas.
/// Empty segments are kept, so `"a,,b"` yields three topics.
pub fn parse_topics(raw: &str) -> Vec<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact.split(',').map(str::to_string).collect()
}
