//! Wire format between the Rust harness and the Playwright host
//!
//! Newline-delimited JSON in both directions. The harness sends commands and
//! route replies; the host sends command responses, route events and logs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{E2eError, E2eResult};

pub const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Harness → host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Command {
        id: u64,
        op: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<u64>,
        args: Value,
    },
    RouteReply { route_id: u64, action: RouteAction },
}

/// Host → harness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Response {
        id: u64,
        ok: bool,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        error: Option<BrowserFault>,
    },
    /// A request matched a registered rule and is waiting for a decision
    Route {
        route_id: u64,
        context: u64,
        rule_id: u64,
        request: InterceptedRequest,
    },
    /// Result of a `fetch` decision
    Upstream {
        route_id: u64,
        context: u64,
        rule_id: u64,
        request: InterceptedRequest,
        #[serde(default)]
        response: Option<UpstreamResponse>,
        #[serde(default)]
        error: Option<String>,
    },
    Log { level: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserFault {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    pub url: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Headers that describe the upstream encoding and go stale once the body has been decoded
pub const STALE_HEADERS: [&str; 2] = ["content-length", "content-encoding"];

impl UpstreamResponse {
    /// Headers safe to send again with the decoded body
    pub fn replayable_headers(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .filter(|(name, _)| !STALE_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// How the host should settle an intercepted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteAction {
    /// Hand the request to the next matching rule, or to the network
    Continue,
    /// Perform the real request and report it back as `Inbound::Upstream`
    Fetch,
    /// Answer with this response
    Fulfill {
        status: u16,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        body: String,
    },
}

impl From<UpstreamResponse> for RouteAction {
    fn from(upstream: UpstreamResponse) -> Self {
        RouteAction::Fulfill {
            status: upstream.status,
            headers: upstream.replayable_headers(),
            body: upstream.body,
        }
    }
}

pub fn encode_frame(message: &Outbound) -> E2eResult<Vec<u8>> {
    let mut encoded = serde_json::to_vec(message)?;
    if encoded.len() > MAX_FRAME_BYTES {
        return Err(E2eError::Driver(format!(
            "frame of {} bytes exceeds {} byte limit",
            encoded.len(),
            MAX_FRAME_BYTES
        )));
    }
    encoded.push(b'\n');
    Ok(encoded)
}

pub fn decode_line(line: &str) -> E2eResult<Inbound> {
    if line.len() > MAX_FRAME_BYTES {
        return Err(E2eError::Driver(format!(
            "frame of {} bytes exceeds {} byte limit",
            line.len(),
            MAX_FRAME_BYTES
        )));
    }
    Ok(serde_json::from_str(line)?)
}
