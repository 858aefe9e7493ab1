//! Route interception rules
//!
//! A [`RouteRule`] pairs a URL glob and an optional method filter with a
//! response strategy. `Passthrough` fetches the real response and rewrites
//! it; `Synthetic` answers without touching the network. Requests that fail
//! the method filter are continued untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::driver::protocol::{InterceptedRequest, RouteAction, UpstreamResponse};
use crate::driver::RouteHandler;
use crate::error::{E2eError, E2eResult};
use crate::mocks::friends::{FriendsOverrides, FriendsResponse};
use crate::page::Page;

pub const QUERY_FRIENDS_PATTERN: &str =
    "**/service/friends-search/idl/chesscom.friends_search.v1.FriendsSearchService/QueryFriends*";
pub const ANY_QUERY_FRIENDS_PATTERN: &str = "**/QueryFriends*";
pub const FRIENDS_COUNT_PATTERN: &str = "**/GetFriendsCount*";
pub const FRIEND_DELETE_PATTERN: &str = "**/callback/friend/delete/*";

static FRIEND_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/callback/friend/delete/(\d+)").unwrap());

pub type Transform =
    Arc<dyn Fn(&InterceptedRequest, &UpstreamResponse) -> E2eResult<MockResponse> + Send + Sync>;
pub type Responder = Arc<dyn Fn(&InterceptedRequest) -> MockResponse + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body: body.to_string(),
        }
    }
}

impl From<MockResponse> for RouteAction {
    fn from(response: MockResponse) -> Self {
        RouteAction::Fulfill {
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }
}

#[derive(Clone)]
pub enum ResponseStrategy {
    Passthrough(Transform),
    Synthetic(Responder),
}

pub struct RouteRule {
    pattern: String,
    matcher: Regex,
    method: Option<String>,
    strategy: ResponseStrategy,
}

impl RouteRule {
    pub fn new(pattern: &str, method: Option<&str>, strategy: ResponseStrategy) -> E2eResult<Self> {
        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob_to_regex(pattern)?,
            method: method.map(str::to_ascii_uppercase),
            strategy,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Both the URL glob and the method filter accept `request`
    pub fn matches(&self, request: &InterceptedRequest) -> bool {
        let method_ok = match &self.method {
            Some(method) => request.method.eq_ignore_ascii_case(method),
            None => true,
        };
        method_ok && self.matcher.is_match(&request.url)
    }

    pub async fn install(self, page: &Page) -> E2eResult<u64> {
        let pattern = self.pattern.clone();
        page.route(&pattern, Arc::new(self)).await
    }
}

impl RouteHandler for RouteRule {
    fn on_request(&self, request: &InterceptedRequest) -> RouteAction {
        if !self.matches(request) {
            debug!("{} {} passes {}", request.method, request.url, self.pattern);
            return RouteAction::Continue;
        }
        match &self.strategy {
            ResponseStrategy::Passthrough(_) => RouteAction::Fetch,
            ResponseStrategy::Synthetic(respond) => respond(request).into(),
        }
    }

    fn on_upstream(
        &self,
        request: &InterceptedRequest,
        upstream: Result<UpstreamResponse, String>,
    ) -> RouteAction {
        let transform = match &self.strategy {
            ResponseStrategy::Passthrough(transform) => transform,
            ResponseStrategy::Synthetic(_) => {
                return upstream.map(RouteAction::from).unwrap_or(RouteAction::Continue);
            }
        };

        match upstream {
            Ok(response) => match transform(request, &response) {
                Ok(mocked) => mocked.into(),
                Err(e) => {
                    warn!(
                        "Mock transform failed for {}, serving upstream response: {}",
                        request.url, e
                    );
                    response.into()
                }
            },
            Err(e) => {
                warn!("Upstream fetch failed for {}, continuing request: {}", request.url, e);
                RouteAction::Continue
            }
        }
    }
}

/// Translate a URL glob into an anchored regex: `**` spans path segments,
/// `*` stays within one, everything else is literal.
pub fn glob_to_regex(glob: &str) -> E2eResult<Regex> {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                out.push_str(".*");
            } else {
                out.push_str("[^/]*");
            }
        } else {
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out.push('$');
    Regex::new(&out)
        .map_err(|e| E2eError::InvalidConfig(format!("bad route pattern {}: {}", glob, e)))
}

/// Replace every `friends[].userView.username` with `username`, keeping the
/// upstream status and headers.
pub fn rewrite_usernames(upstream: &UpstreamResponse, username: &str) -> E2eResult<MockResponse> {
    let mut body: Value = serde_json::from_str(&upstream.body)?;

    if let Some(friends) = body.get_mut("friends").and_then(Value::as_array_mut) {
        for friend in friends {
            let present = friend
                .pointer("/userView/username")
                .and_then(Value::as_str)
                .map_or(false, |name| !name.is_empty());
            if present {
                friend["userView"]["username"] = Value::String(username.to_string());
            }
        }
    }

    Ok(MockResponse {
        status: upstream.status,
        headers: upstream.replayable_headers(),
        body: serde_json::to_string(&body)?,
    })
}

/// Canned success for a friend deletion; the id is read back from `url`
pub fn deletion_response(url: &str) -> MockResponse {
    let id = FRIEND_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map_or("unknown", |m| m.as_str());
    let message = format!("Friend with ID {} has been removed from your friends list", id);
    MockResponse::json(200, &json!({ "message": message }))
}

pub fn empty_friends_response() -> MockResponse {
    MockResponse::json(
        200,
        &json!({
            "pagination": { "nextPageToken": "", "totalSize": 0 },
            "friends": []
        }),
    )
}

/// Serve real friends data with every username swapped for the mock one.
///
/// Returns the effective mock data after `overrides`.
pub async fn mock_friends_api(
    page: &Page,
    overrides: FriendsOverrides,
) -> E2eResult<FriendsResponse> {
    let data = FriendsResponse::mock().with_overrides(overrides);
    let username = data.display_username().to_string();

    let transform: Transform = Arc::new(move |_, upstream| rewrite_usernames(upstream, &username));
    RouteRule::new(QUERY_FRIENDS_PATTERN, Some("POST"), ResponseStrategy::Passthrough(transform))?
        .install(page)
        .await?;
    Ok(data)
}

pub async fn mock_empty_friends_api(page: &Page) -> E2eResult<()> {
    RouteRule::new(
        ANY_QUERY_FRIENDS_PATTERN,
        Some("POST"),
        ResponseStrategy::Synthetic(Arc::new(|_| empty_friends_response())),
    )?
    .install(page)
    .await?;

    RouteRule::new(
        FRIENDS_COUNT_PATTERN,
        None,
        ResponseStrategy::Synthetic(Arc::new(|_| MockResponse::json(200, &json!({})))),
    )?
    .install(page)
    .await?;
    Ok(())
}

pub async fn mock_friend_deletion_api(page: &Page) -> E2eResult<()> {
    RouteRule::new(
        FRIEND_DELETE_PATTERN,
        Some("DELETE"),
        ResponseStrategy::Synthetic(Arc::new(|request| deletion_response(&request.url))),
    )?
    .install(page)
    .await?;
    Ok(())
}
