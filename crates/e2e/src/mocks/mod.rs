//! Network mocks for the friends feature
//!
//! [`friends`] holds the canned data; [`routes`] turns it into interception
//! rules installed on a [`Page`](crate::page::Page).

pub mod friends;
pub mod routes;

pub use friends::{Friend, FriendStatus, FriendsOverrides, FriendsResponse, MOCK_USERNAME};
pub use routes::{
    mock_empty_friends_api, mock_friend_deletion_api, mock_friends_api, MockResponse,
    ResponseStrategy, RouteRule,
};
