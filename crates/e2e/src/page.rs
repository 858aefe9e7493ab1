//! One browsing context and its page
//!
//! Every wait here is bounded. Actions fail with the browser's error; the
//! `expect_*` family fails with [`E2eError::AssertionFailed`] describing what
//! was expected and what was last observed.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::driver::{Driver, RouteHandler};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::session::SessionState;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Element state awaited by [`Page::wait_for`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadState {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

#[derive(Clone)]
pub struct Page {
    driver: Driver,
    context: u64,
    expect_timeout: Duration,
}

impl Page {
    pub(crate) fn new(driver: Driver, context: u64, expect_timeout: Duration) -> Self {
        Self {
            driver,
            context,
            expect_timeout,
        }
    }

    pub fn context_id(&self) -> u64 {
        self.context
    }

    /// Default bound for `expect_*` calls
    pub fn expect_timeout(&self) -> Duration {
        self.expect_timeout
    }

    async fn call(&self, op: &str, args: Value, timeout: Duration) -> E2eResult<Value> {
        self.driver.call(Some(self.context), op, args, timeout).await
    }

    async fn locator_call(
        &self,
        op: &str,
        locator: &Locator,
        extra: Value,
        timeout: Duration,
    ) -> E2eResult<Value> {
        let mut args = json!({ "locator": locator, "timeout_ms": millis(timeout) });
        if let (Value::Object(args), Value::Object(extra)) = (&mut args, extra) {
            args.extend(extra);
        }
        self.call(op, args, timeout).await
    }

    // ---- navigation ----

    /// Navigate to `url`, resolved against the context's base URL
    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        let timeout = Duration::from_secs(30);
        self.call("goto", json!({ "url": url, "timeout_ms": millis(timeout) }), timeout)
            .await?;
        Ok(())
    }

    pub async fn url(&self) -> E2eResult<String> {
        let value = self.call("url", json!({}), Duration::from_secs(5)).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| E2eError::Driver(format!("url returned {}", value)))
    }

    /// Wait until the current URL satisfies `predicate`
    pub async fn wait_for_url<P>(
        &self,
        description: &str,
        timeout: Duration,
        predicate: P,
    ) -> E2eResult<String>
    where
        P: Fn(&str) -> bool,
    {
        let predicate = &predicate;
        let outcome = poll_until(timeout, move || async move {
            let url = self.url().await?;
            Ok::<_, E2eError>(if predicate(&url) { Ok(url) } else { Err(url) })
        })
        .await?;

        outcome.map_err(|last| {
            E2eError::Timeout(format!(
                "URL {} within {} ms (last: {})",
                description,
                timeout.as_millis(),
                last
            ))
        })
    }

    pub async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.wait_for_load_state_within(state, Duration::from_secs(30)).await
    }

    pub async fn wait_for_load_state_within(
        &self,
        state: LoadState,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.call(
            "wait_for_load_state",
            json!({ "state": state, "timeout_ms": millis(timeout) }),
            timeout,
        )
        .await?;
        Ok(())
    }

    // ---- element actions ----

    pub async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.click_within(locator, self.expect_timeout).await
    }

    pub async fn click_within(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        debug!("click {}", locator);
        self.locator_call("click", locator, json!({}), timeout).await?;
        Ok(())
    }

    pub async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        debug!("fill {}", locator);
        self.locator_call("fill", locator, json!({ "value": value }), self.expect_timeout)
            .await?;
        Ok(())
    }

    pub async fn clear(&self, locator: &Locator) -> E2eResult<()> {
        self.locator_call("clear", locator, json!({}), self.expect_timeout)
            .await?;
        Ok(())
    }

    pub async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.locator_call("wait_for", locator, json!({ "state": state }), timeout)
            .await?;
        Ok(())
    }

    /// Probe: true when the first match becomes visible within `timeout`.
    /// Errors count as "not visible".
    pub async fn is_visible(&self, locator: &Locator, timeout: Duration) -> bool {
        match self.locator_call("is_visible", locator, json!({}), timeout).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                debug!("visibility probe for {} failed: {}", locator, e);
                false
            }
        }
    }

    pub async fn is_enabled(&self, locator: &Locator) -> E2eResult<bool> {
        let value = self
            .locator_call("is_enabled", locator, json!({}), self.expect_timeout)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let value = self
            .locator_call("count", locator, json!({}), self.expect_timeout)
            .await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Driver(format!("count returned {}", value)))
    }

    pub async fn get_attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .locator_call("get_attribute", locator, json!({ "name": name }), self.expect_timeout)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let value = self
            .locator_call("text_content", locator, json!({}), self.expect_timeout)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        let value = self
            .locator_call("input_value", locator, json!({}), self.expect_timeout)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    // ---- client state ----

    /// Evaluate a JavaScript expression in the page
    pub async fn evaluate(&self, expression: &str) -> E2eResult<Value> {
        self.call("evaluate", json!({ "expression": expression }), self.expect_timeout)
            .await
    }

    pub async fn set_local_storage(&self, entries: &[(&str, &str)]) -> E2eResult<()> {
        self.call(
            "set_local_storage",
            json!({ "entries": entries }),
            self.expect_timeout,
        )
        .await?;
        Ok(())
    }

    /// Clear localStorage and sessionStorage of the current origin
    pub async fn clear_storage(&self) -> E2eResult<()> {
        self.call("clear_storage", json!({}), self.expect_timeout).await?;
        Ok(())
    }

    pub async fn clear_cookies(&self) -> E2eResult<()> {
        self.call("clear_cookies", json!({}), self.expect_timeout).await?;
        Ok(())
    }

    /// Cookies and per-origin storage of this context
    pub async fn storage_state(&self) -> E2eResult<SessionState> {
        let value = self
            .call("storage_state", json!({}), Duration::from_secs(10))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    // ---- network ----

    /// Register `handler` for requests whose URL matches the glob `pattern`
    pub async fn route(&self, pattern: &str, handler: Arc<dyn RouteHandler>) -> E2eResult<u64> {
        self.driver.install_route(self.context, pattern, handler).await
    }

    /// Remove every interception rule of this context. Idempotent.
    pub async fn unroute_all(&self) -> E2eResult<()> {
        self.driver.remove_routes(self.context).await
    }

    pub fn active_routes(&self) -> usize {
        self.driver.active_routes(self.context)
    }

    // ---- diagnostics ----

    pub async fn start_tracing(&self) -> E2eResult<()> {
        self.call("tracing_start", json!({}), Duration::from_secs(10))
            .await?;
        Ok(())
    }

    /// Stop tracing, keeping the trace only when `path` is given
    pub async fn stop_tracing(&self, path: Option<&Path>) -> E2eResult<()> {
        let args = match path {
            Some(path) => json!({ "path": path }),
            None => json!({}),
        };
        self.call("tracing_stop", args, Duration::from_secs(30)).await?;
        Ok(())
    }

    pub(crate) async fn axe_scan(&self) -> E2eResult<Value> {
        self.call("axe_scan", json!({}), Duration::from_secs(60)).await
    }

    pub async fn close(&self) -> E2eResult<()> {
        match self.call("close_context", json!({}), Duration::from_secs(10)).await {
            Ok(_) | Err(E2eError::DriverClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    // ---- assertions ----

    pub async fn expect_visible(&self, locator: &Locator) -> E2eResult<()> {
        self.expect_visible_within(locator, self.expect_timeout).await
    }

    pub async fn expect_visible_within(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.expect_state(locator, WaitState::Visible, timeout).await
    }

    pub async fn expect_hidden(&self, locator: &Locator) -> E2eResult<()> {
        self.expect_state(locator, WaitState::Hidden, self.expect_timeout)
            .await
    }

    async fn expect_state(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        match self.wait_for(locator, state, timeout).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_timeout() => Err(E2eError::AssertionFailed(format!(
                "expected {} to be {:?} within {} ms",
                locator,
                state,
                timeout.as_millis()
            ))),
            Err(e) => Err(e),
        }
    }

    pub async fn expect_enabled(&self, locator: &Locator) -> E2eResult<()> {
        let outcome = poll_until(self.expect_timeout, move || async move {
            let enabled = self.is_enabled(locator).await?;
            Ok::<_, E2eError>(if enabled { Ok(()) } else { Err("disabled".to_string()) })
        })
        .await?;
        outcome.map_err(|last| {
            E2eError::AssertionFailed(format!("expected {} to be enabled (was {})", locator, last))
        })
    }

    /// Whitespace-normalized exact text match
    pub async fn expect_text(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        let wanted = normalize_whitespace(expected);
        let wanted = wanted.as_str();
        self.expect_observed(locator, "text", move || async move {
            let text = self.text_content(locator).await?.unwrap_or_default();
            let text = normalize_whitespace(&text);
            Ok::<_, E2eError>(if text == wanted { Ok(()) } else { Err(text) })
        }, expected)
        .await
    }

    pub async fn expect_contains_text(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        self.expect_observed(locator, "text containing", move || async move {
            let text = self.text_content(locator).await?.unwrap_or_default();
            Ok::<_, E2eError>(if text.contains(expected) { Ok(()) } else { Err(text) })
        }, expected)
        .await
    }

    pub async fn expect_value(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        self.expect_value_within(locator, expected, self.expect_timeout)
            .await
    }

    pub async fn expect_value_within(
        &self,
        locator: &Locator,
        expected: &str,
        timeout: Duration,
    ) -> E2eResult<()> {
        let outcome = poll_until(timeout, move || async move {
            let value = self.input_value(locator).await?;
            Ok::<_, E2eError>(if value == expected { Ok(()) } else { Err(value) })
        })
        .await?;
        outcome.map_err(|last| {
            E2eError::AssertionFailed(format!(
                "expected {} to have value '{}' but it was '{}'",
                locator, expected, last
            ))
        })
    }

    pub async fn expect_attribute(
        &self,
        locator: &Locator,
        name: &str,
        expected: &str,
    ) -> E2eResult<()> {
        let outcome = poll_until(self.expect_timeout, move || async move {
            let value = self.get_attribute(locator, name).await?;
            Ok::<_, E2eError>(match value {
                Some(v) if v == expected => Ok(()),
                Some(v) => Err(v),
                None => Err("<absent>".to_string()),
            })
        })
        .await?;
        outcome.map_err(|last| {
            E2eError::AssertionFailed(format!(
                "expected {} to have {}='{}' but it was '{}'",
                locator, name, expected, last
            ))
        })
    }

    pub async fn expect_count(&self, locator: &Locator, expected: usize) -> E2eResult<()> {
        let outcome = poll_until(self.expect_timeout, move || async move {
            let count = self.count(locator).await?;
            Ok::<_, E2eError>(if count == expected { Ok(()) } else { Err(count.to_string()) })
        })
        .await?;
        outcome.map_err(|last| {
            E2eError::AssertionFailed(format!(
                "expected {} to match {} element(s) but found {}",
                locator, expected, last
            ))
        })
    }

    pub async fn expect_url(&self, pattern: &Regex) -> E2eResult<()> {
        let description = format!("matching /{}/", pattern);
        self.wait_for_url(&description, self.expect_timeout, |url| pattern.is_match(url))
            .await
            .map(|_| ())
            .map_err(timeout_to_assertion)
    }

    pub async fn expect_url_not(&self, pattern: &Regex) -> E2eResult<()> {
        let description = format!("not matching /{}/", pattern);
        self.wait_for_url(&description, self.expect_timeout, |url| !pattern.is_match(url))
            .await
            .map(|_| ())
            .map_err(timeout_to_assertion)
    }

    async fn expect_observed<F, Fut>(
        &self,
        locator: &Locator,
        what: &str,
        check: F,
        expected: &str,
    ) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<Result<(), String>>>,
    {
        poll_until(self.expect_timeout, check).await?.map_err(|last| {
            E2eError::AssertionFailed(format!(
                "expected {} to have {} '{}' but it was '{}'",
                locator, what, expected, last
            ))
        })
    }
}

fn timeout_to_assertion(e: E2eError) -> E2eError {
    match e {
        E2eError::Timeout(message) => E2eError::AssertionFailed(message),
        other => other,
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Re-run `check` until it reports success or `timeout` elapses.
///
/// `check` yields `Ok(Ok(v))` when satisfied and `Ok(Err(observed))` when not
/// yet; errors are treated as "not yet", except a closed driver, which is
/// returned at once. On expiry the last observation comes back as `Ok(Err(_))`
/// so the caller can describe it.
pub(crate) async fn poll_until<T, F, Fut>(
    timeout: Duration,
    mut check: F,
) -> E2eResult<Result<T, String>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Result<T, String>>>,
{
    let deadline = Instant::now() + timeout;
    let mut last = String::from("<never observed>");
    loop {
        match check().await {
            Ok(Ok(value)) => return Ok(Ok(value)),
            Ok(Err(observed)) => last = observed,
            Err(E2eError::DriverClosed) => return Err(E2eError::DriverClosed),
            Err(e) => last = e.to_string(),
        }
        if Instant::now() >= deadline {
            return Ok(Err(last));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(normalize_whitespace("  Are you\n sure?  "), "Are you sure?");
    }

    #[tokio::test]
    async fn poll_returns_once_satisfied() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let result = poll_until(Duration::from_secs(2), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(if n >= 2 { Ok(n) } else { Err(format!("attempt {}", n)) })
        })
        .await
        .unwrap();

        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn poll_reports_last_observation_on_expiry() {
        let result: Result<(), String> = poll_until(Duration::from_millis(250), || async {
            Ok(Err("still loading".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(result, Err("still loading".to_string()));
    }

    #[tokio::test]
    async fn poll_treats_errors_as_not_yet() {
        let result: Result<(), String> = poll_until(Duration::from_millis(150), || async {
            Err(E2eError::Driver("Execution context was destroyed".to_string()))
        })
        .await
        .unwrap();

        assert_eq!(result, Err("Driver error: Execution context was destroyed".to_string()));
    }

    #[tokio::test]
    async fn poll_stops_at_once_when_driver_is_gone() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let started = Instant::now();
        let result: E2eResult<Result<(), String>> =
            poll_until(Duration::from_secs(5), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(E2eError::DriverClosed)
            })
            .await;

        assert!(matches!(result, Err(E2eError::DriverClosed)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
