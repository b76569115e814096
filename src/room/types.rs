use serde::{Deserialize, Serialize};

use super::models::{RoomModel, RoomWithMembers};
use crate::session::CurrentUser;

/// Query string for GET /rooms
#[derive(Debug, Default, Deserialize)]
pub struct ListRoomsQuery {
    pub user: Option<String>,
    pub search: Option<String>,
}

/// Which rooms to list; `user` wins over `search` when both are given
#[derive(Debug, Clone, PartialEq)]
pub enum RoomFilter {
    All,
    HostedBy(i64),
    /// A host filter that can't match any room (`user` is not a whole number)
    Nothing,
    Search(String),
}

impl From<ListRoomsQuery> for RoomFilter {
    fn from(query: ListRoomsQuery) -> Self {
        let user = query.user.filter(|u| !u.is_empty());
        let search = query.search.filter(|s| !s.is_empty());

        match (user, search) {
            (Some(user), _) => host_id(&user)
                .map(RoomFilter::HostedBy)
                .unwrap_or(RoomFilter::Nothing),
            (None, Some(search)) => RoomFilter::Search(search),
            (None, None) => RoomFilter::All,
        }
    }
}

/// Reads `user` as a number, so `1`, `1.0` and `1e0` all name host 1
fn host_id(user: &str) -> Option<i64> {
    let value: f64 = user.trim().parse().ok()?;
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// Query string for POST /rooms; fields are optional so absence is reported as 409
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomQuery {
    pub room_name: Option<String>,
    pub topics: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomModel>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub room: RoomWithMembers,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveRoomResponse {
    pub room: RoomModel,
    pub user: CurrentUser,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberResponse {
    pub updated_room: RoomModel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn filter(user: Option<&str>, search: Option<&str>) -> RoomFilter {
        RoomFilter::from(ListRoomsQuery {
            user: user.map(str::to_string),
            search: search.map(str::to_string),
        })
    }

    #[test]
    fn test_user_takes_precedence_over_search() {
        assert_eq!(filter(Some("5"), Some("chess")), RoomFilter::HostedBy(5));
    }

    #[test]
    fn test_search_only() {
        assert_eq!(
            filter(None, Some("chess")),
            RoomFilter::Search("chess".to_string())
        );
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        assert_eq!(filter(Some(""), Some("")), RoomFilter::All);
        assert_eq!(
            filter(Some(""), Some("go")),
            RoomFilter::Search("go".to_string())
        );
    }

    #[test]
    fn test_non_numeric_user_matches_nothing() {
        assert_eq!(filter(Some("abc"), None), RoomFilter::Nothing);
    }

    #[rstest]
    #[case("1", Some(1))]
    #[case(" 7 ", Some(7))]
    #[case("1.0", Some(1))]
    #[case("1e0", Some(1))]
    #[case("-3", Some(-3))]
    #[case("1.5", None)]
    #[case("NaN", None)]
    #[case("inf", None)]
    #[case("1e30", None)]
    fn test_user_reads_as_number(#[case] user: &str, #[case] expected: Option<i64>) {
        let expected = expected.map_or(RoomFilter::Nothing, RoomFilter::HostedBy);
        assert_eq!(filter(Some(user), None), expected);
    }
}
