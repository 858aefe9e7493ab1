//! Friends endpoint interception through the bridge

mod common;

use chessqa_e2e::mocks::routes::{
    ANY_QUERY_FRIENDS_PATTERN, FRIENDS_COUNT_PATTERN, FRIEND_DELETE_PATTERN, QUERY_FRIENDS_PATTERN,
};
use chessqa_e2e::mocks::{
    mock_empty_friends_api, mock_friend_deletion_api, mock_friends_api, Friend, FriendsOverrides,
};
use common::FakeHost;
use serde_json::{json, Value};

const QUERY_URL: &str = concat!(
    "https://www.chess.com/service/friends-search/idl/",
    "chesscom.friends_search.v1.FriendsSearchService/QueryFriends"
);

fn upstream(body: Value) -> Value {
    json!({
        "status": 200,
        "headers": {
            "content-type": "application/json",
            "content-length": "999",
            "x-cache": "HIT"
        },
        "body": body.to_string()
    })
}

fn body_of(action: &Value) -> Value {
    assert_eq!(action["kind"], "fulfill", "{}", action);
    serde_json::from_str(action["body"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn usernames_are_replaced_in_live_response() {
    let host = FakeHost::start();
    let page = host.page().await;

    let data = mock_friends_api(&page, FriendsOverrides::default()).await.unwrap();
    assert_eq!(data.friends[0].username, "MOCK USER");

    let rules = host.rules(page.context_id());
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].1, QUERY_FRIENDS_PATTERN);
    assert_eq!(page.active_routes(), 1);

    let live = json!({
        "friends": [
            { "userView": { "username": "Hikaru", "userId": 1 } },
            { "userView": { "username": "GothamChess", "userId": 2 } }
        ],
        "pagination": { "totalSize": 2 }
    });
    let action = host
        .intercept(page.context_id(), rules[0].0, "POST", QUERY_URL, Some(Ok(upstream(live))))
        .await;

    let body = body_of(&action);
    for friend in body["friends"].as_array().unwrap() {
        assert_eq!(friend["userView"]["username"], "MOCK USER");
    }
    assert_eq!(body["pagination"]["totalSize"], 2);
    assert_eq!(action["status"], 200);
    assert_eq!(action["headers"]["x-cache"], "HIT");
    assert!(action["headers"].get("content-length").is_none());
}

#[tokio::test]
async fn overridden_username_is_used() {
    let host = FakeHost::start();
    let page = host.page().await;
    let mut friend = Friend::mock();
    friend.username = "STAND IN".to_string();

    mock_friends_api(
        &page,
        FriendsOverrides {
            friends: Some(vec![friend]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let rule = host.rules(page.context_id())[0].0;
    let live = json!({ "friends": [{ "userView": { "username": "Hikaru" } }] });
    let action = host
        .intercept(page.context_id(), rule, "POST", QUERY_URL, Some(Ok(upstream(live))))
        .await;
    assert_eq!(body_of(&action)["friends"][0]["userView"]["username"], "STAND IN");
}

#[tokio::test]
async fn non_post_query_is_not_touched() {
    let host = FakeHost::start();
    let page = host.page().await;
    mock_friends_api(&page, FriendsOverrides::default()).await.unwrap();
    let rule = host.rules(page.context_id())[0].0;

    let action = host.intercept(page.context_id(), rule, "GET", QUERY_URL, None).await;
    assert_eq!(action, json!({ "kind": "continue" }));
}

#[tokio::test]
async fn unparsable_upstream_is_served_without_encoding_headers() {
    let host = FakeHost::start();
    let page = host.page().await;
    mock_friends_api(&page, FriendsOverrides::default()).await.unwrap();
    let rule = host.rules(page.context_id())[0].0;

    let original = json!({
        "status": 503,
        "headers": {
            "content-type": "text/html",
            "content-encoding": "br",
            "content-length": "13"
        },
        "body": "<h1>down</h1>"
    });
    let action = host
        .intercept(page.context_id(), rule, "POST", QUERY_URL, Some(Ok(original)))
        .await;

    assert_eq!(action["kind"], "fulfill");
    assert_eq!(action["status"], 503);
    assert_eq!(action["body"], "<h1>down</h1>");
    assert_eq!(action["headers"], json!({ "content-type": "text/html" }));
}

#[tokio::test]
async fn failed_fetch_lets_request_through() {
    let host = FakeHost::start();
    let page = host.page().await;
    mock_friends_api(&page, FriendsOverrides::default()).await.unwrap();
    let rule = host.rules(page.context_id())[0].0;

    let action = host
        .intercept(
            page.context_id(),
            rule,
            "POST",
            QUERY_URL,
            Some(Err("net::ERR_CONNECTION_RESET".to_string())),
        )
        .await;
    assert_eq!(action, json!({ "kind": "continue" }));
}

#[tokio::test]
async fn empty_friends_mock_answers_both_endpoints() {
    let host = FakeHost::start();
    let page = host.page().await;
    mock_empty_friends_api(&page).await.unwrap();

    let rules = host.rules(page.context_id());
    let patterns: Vec<_> = rules.iter().map(|(_, p)| p.as_str()).collect();
    assert_eq!(patterns, vec![ANY_QUERY_FRIENDS_PATTERN, FRIENDS_COUNT_PATTERN]);

    let query = host.intercept(page.context_id(), rules[0].0, "POST", QUERY_URL, None).await;
    assert_eq!(
        body_of(&query),
        json!({ "pagination": { "nextPageToken": "", "totalSize": 0 }, "friends": [] })
    );
    assert_eq!(query["headers"]["content-type"], "application/json");

    let count_url = "https://www.chess.com/service/friends/GetFriendsCount";
    let count = host.intercept(page.context_id(), rules[1].0, "GET", count_url, None).await;
    assert_eq!(body_of(&count), json!({}));
}

#[tokio::test]
async fn deletion_is_confirmed_with_friend_id() {
    let host = FakeHost::start();
    let page = host.page().await;
    mock_friend_deletion_api(&page).await.unwrap();
    let (rule, pattern) = host.rules(page.context_id())[0].clone();
    assert_eq!(pattern, FRIEND_DELETE_PATTERN);

    let url = "https://www.chess.com/callback/friend/delete/987654";
    let action = host.intercept(page.context_id(), rule, "DELETE", url, None).await;
    assert_eq!(
        body_of(&action)["message"],
        "Friend with ID 987654 has been removed from your friends list"
    );

    let other = host.intercept(page.context_id(), rule, "POST", url, None).await;
    assert_eq!(other["kind"], "continue");
}

#[tokio::test]
async fn unroute_all_is_idempotent() {
    let host = FakeHost::start();
    let page = host.page().await;
    mock_empty_friends_api(&page).await.unwrap();
    mock_friend_deletion_api(&page).await.unwrap();
    assert_eq!(page.active_routes(), 3);
    let rule = host.rules(page.context_id())[0].0;

    page.unroute_all().await.unwrap();
    page.unroute_all().await.unwrap();

    assert_eq!(page.active_routes(), 0);
    assert_eq!(host.calls("unroute_all").len(), 2);

    // A request already queued for a removed rule still gets settled.
    let late = host.intercept(page.context_id(), rule, "POST", QUERY_URL, None).await;
    assert_eq!(late["kind"], "continue");
}

#[tokio::test]
async fn rules_are_scoped_to_their_context() {
    let host = FakeHost::start();
    let first = host.page().await;
    let second = host.page().await;

    mock_friend_deletion_api(&first).await.unwrap();
    second.unroute_all().await.unwrap();

    assert_eq!(first.active_routes(), 1);
    assert_eq!(second.active_routes(), 0);
}
