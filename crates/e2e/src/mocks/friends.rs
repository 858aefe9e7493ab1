use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const MOCK_FRIEND_ID: &str = "mock-friend-0000-0000-0000-000000000001";
pub const MOCK_USERNAME: &str = "MOCK USER";
pub const NO_AVATAR_URL: &str = "https://www.chess.com/bundles/web/images/noavatar_l.84a92436.gif";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub rating: u32,
    pub status: FriendStatus,
    pub last_seen: String,
    pub avatar: String,
    pub country: String,
    pub title: String,
    pub is_online: bool,
    pub friendship_duration: String,
}

impl Friend {
    /// The single friend every mocked list starts from
    pub fn mock() -> Self {
        Self {
            id: MOCK_FRIEND_ID.to_string(),
            username: MOCK_USERNAME.to_string(),
            display_name: MOCK_USERNAME.to_string(),
            rating: 1200,
            status: FriendStatus::Online,
            last_seen: "2 minutes ago".to_string(),
            avatar: NO_AVATAR_URL.to_string(),
            country: "US".to_string(),
            title: String::new(),
            is_online: true,
            friendship_duration: "1 day".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsResponse {
    pub friends: Vec<Friend>,
    pub total_friends: u32,
    pub has_more: bool,
}

/// Field-level replacements applied on top of [`FriendsResponse::mock`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friends: Option<Vec<Friend>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_friends: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl Default for FriendsResponse {
    fn default() -> Self {
        Self::mock()
    }
}

impl FriendsResponse {
    pub fn mock() -> Self {
        Self {
            friends: vec![Friend::mock()],
            total_friends: 1,
            has_more: false,
        }
    }

    pub fn with_overrides(mut self, overrides: FriendsOverrides) -> Self {
        if let Some(friends) = overrides.friends {
            self.friends = friends;
        }
        if let Some(total) = overrides.total_friends {
            self.total_friends = total;
        }
        if let Some(has_more) = overrides.has_more {
            self.has_more = has_more;
        }
        self
    }

    /// Username written into intercepted responses
    pub fn display_username(&self) -> &str {
        self.friends
            .first()
            .map(|f| f.username.as_str())
            .unwrap_or(MOCK_USERNAME)
    }

    /// Check the envelope is something the real service could have sent
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for friend in &self.friends {
            if !seen.insert(friend.id.as_str()) {
                return Err(format!("duplicate friend id {}", friend.id));
            }
            if (friend.status == FriendStatus::Online) != friend.is_online {
                return Err(format!(
                    "friend {} has status {:?} but isOnline={}",
                    friend.id, friend.status, friend.is_online
                ));
            }
        }
        if !self.has_more && (self.total_friends as usize) < self.friends.len() {
            return Err(format!(
                "totalFriends={} is below the {} friends returned on the last page",
                self.total_friends,
                self.friends.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_data_is_consistent() {
        let data = FriendsResponse::mock();
        assert!(data.validate().is_ok());
        assert_eq!(data.display_username(), "MOCK USER");
    }

    #[test]
    fn serializes_in_camel_case() {
        let value = serde_json::to_value(FriendsResponse::mock()).unwrap();
        assert_eq!(value["totalFriends"], 1);
        assert_eq!(value["hasMore"], false);
        let friend = &value["friends"][0];
        assert_eq!(friend["displayName"], "MOCK USER");
        assert_eq!(friend["isOnline"], true);
        assert_eq!(friend["status"], "online");
        assert_eq!(friend["friendshipDuration"], "1 day");
        assert_eq!(friend["avatar"], NO_AVATAR_URL);
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut other = Friend::mock();
        other.id = "mock-friend-2".to_string();
        other.username = "SECOND".to_string();

        let data = FriendsResponse::mock().with_overrides(FriendsOverrides {
            friends: Some(vec![other.clone(), Friend::mock()]),
            total_friends: Some(2),
            ..Default::default()
        });

        assert_eq!(data.friends, vec![other, Friend::mock()]);
        assert_eq!(data.total_friends, 2);
        assert!(!data.has_more);
        assert_eq!(data.display_username(), "SECOND");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let data = FriendsResponse::mock().with_overrides(FriendsOverrides {
            friends: Some(vec![Friend::mock(), Friend::mock()]),
            total_friends: Some(2),
            ..Default::default()
        });
        assert!(data.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn rejects_status_disagreeing_with_flag() {
        let mut friend = Friend::mock();
        friend.status = FriendStatus::Offline;
        let data = FriendsResponse::mock().with_overrides(FriendsOverrides {
            friends: Some(vec![friend]),
            ..Default::default()
        });
        assert!(data.validate().is_err());
    }

    #[test]
    fn total_may_not_undercount_last_page() {
        let data = FriendsResponse::mock().with_overrides(FriendsOverrides {
            total_friends: Some(0),
            ..Default::default()
        });
        assert!(data.validate().is_err());

        let paged = FriendsResponse::mock().with_overrides(FriendsOverrides {
            total_friends: Some(0),
            has_more: Some(true),
            ..Default::default()
        });
        assert!(paged.validate().is_ok());
    }
}
