//! Playwright host process and the bridge to it
//!
//! Playwright runs in a Node.js child that executes `driver.js`. Commands are
//! multiplexed by id over its stdin; a reader task routes responses back to
//! their callers and settles intercepted requests through the registered
//! [`RouteHandler`]s.

pub mod protocol;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use protocol::{
    decode_line, encode_frame, BrowserFault, Inbound, InterceptedRequest, Outbound, RouteAction,
    UpstreamResponse,
};

const DRIVER_SCRIPT: &str = include_str!("driver.js");

/// Extra time allowed for the host to report a bounded wait that ran out
const REPLY_GRACE: Duration = Duration::from_secs(2);
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);
const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);

/// Decides how an intercepted request is settled.
///
/// `on_request` runs first. If it answers [`RouteAction::Fetch`], the host
/// performs the real request and `on_upstream` decides what the page sees.
pub trait RouteHandler: Send + Sync {
    fn on_request(&self, request: &InterceptedRequest) -> RouteAction;

    fn on_upstream(
        &self,
        request: &InterceptedRequest,
        upstream: Result<UpstreamResponse, String>,
    ) -> RouteAction {
        let _ = request;
        match upstream {
            Ok(response) => response.into(),
            Err(_) => RouteAction::Continue,
        }
    }
}

type Writer = Box<dyn AsyncWrite + Send + Unpin>;
type Reply = Result<Value, BrowserFault>;

struct Shared {
    writer: AsyncMutex<Writer>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    routes: Mutex<HashMap<(u64, u64), Arc<dyn RouteHandler>>>,
    closed: AtomicBool,
    next_id: AtomicU64,
    next_rule: AtomicU64,
}

impl Shared {
    async fn send(&self, message: &Outbound) -> E2eResult<()> {
        let frame = encode_frame(message)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    fn handler(&self, context: u64, rule_id: u64) -> Option<Arc<dyn RouteHandler>> {
        self.routes.lock().get(&(context, rule_id)).cloned()
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with DriverClosed.
        self.pending.lock().clear();
    }
}

struct Host {
    child: Mutex<Option<Child>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    _script_dir: Option<tempfile::TempDir>,
}

/// Handle to a running Playwright host. Clones share the same process.
#[derive(Clone)]
pub struct Driver {
    shared: Arc<Shared>,
    host: Arc<Host>,
}

/// Settings for a new isolated browsing context
#[derive(Debug, Clone, Serialize)]
pub struct ContextOptions {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_state: Option<PathBuf>,
    pub viewport: Viewport,
    pub navigation_timeout_ms: u64,
    #[serde(skip)]
    pub expect_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl ContextOptions {
    /// Context for `config`, loaded with the persisted session when `with_session` is set
    pub fn from_config(config: &E2eConfig, with_session: bool) -> Self {
        Self {
            base_url: config.base_url.clone(),
            storage_state: with_session.then(|| config.storage_state.clone()),
            viewport: Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
            },
            navigation_timeout_ms: config.navigation_timeout_ms,
            expect_timeout: config.expect_timeout(),
        }
    }
}

impl Driver {
    /// Start Node.js with the Playwright host script and launch the browser
    pub async fn launch(config: &E2eConfig) -> E2eResult<Self> {
        check_node_installed(&config.node_binary).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("chessqa-driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        // The script lives in a temp dir, so point module resolution at the project.
        let node_path = std::env::current_dir()?.join("node_modules");

        debug!("Spawning Playwright host: {} {}", config.node_binary, script_path.display());
        let mut child = Command::new(&config.node_binary)
            .arg(&script_path)
            .env("NODE_PATH", &node_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Driver(format!("failed to spawn {}: {}", config.node_binary, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("host stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("host stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| E2eError::Driver("host stderr unavailable".to_string()))?;

        let stderr_task = tokio::spawn(forward_stderr(stderr));
        let driver = Self::assemble(stdout, stdin, Some(child), Some(script_dir));
        driver.host.tasks.lock().push(stderr_task);

        let launched = driver
            .call(
                None,
                "launch",
                json!({ "browser": config.browser.as_str(), "headless": config.headless }),
                LAUNCH_TIMEOUT,
            )
            .await;

        match launched {
            Ok(value) => {
                info!(
                    "Launched {} {}",
                    config.browser.as_str(),
                    value["version"].as_str().unwrap_or("(unknown version)")
                );
                Ok(driver)
            }
            // The host dies immediately when `require('playwright')` fails.
            Err(E2eError::DriverClosed) => Err(E2eError::PlaywrightNotFound),
            Err(e) => {
                driver.close().await;
                Err(e)
            }
        }
    }

    /// Bridge over an already-connected host, such as an in-process fake
    pub fn from_transport<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::assemble(reader, writer, None, None)
    }

    fn assemble<R, W>(
        reader: R,
        writer: W,
        child: Option<Child>,
        script_dir: Option<tempfile::TempDir>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Shared {
            writer: AsyncMutex::new(Box::new(writer)),
            pending: Mutex::new(HashMap::new()),
            routes: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            next_rule: AtomicU64::new(1),
        });
        let reader_task = tokio::spawn(reader_loop(reader, shared.clone()));

        Self {
            shared,
            host: Arc::new(Host {
                child: Mutex::new(child),
                tasks: Mutex::new(vec![reader_task]),
                _script_dir: script_dir,
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Send one command and wait for its reply.
    ///
    /// `timeout` is the bound the host applies to the operation itself; the
    /// harness waits slightly longer so the host can report its own timeout.
    pub(crate) async fn call(
        &self,
        context: Option<u64>,
        op: &str,
        args: Value,
        timeout: Duration,
    ) -> E2eResult<Value> {
        if self.is_closed() {
            return Err(E2eError::DriverClosed);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(id, tx);
        if self.is_closed() {
            self.shared.pending.lock().remove(&id);
            return Err(E2eError::DriverClosed);
        }

        let message = Outbound::Command {
            id,
            op: op.to_string(),
            context,
            args,
        };
        if let Err(e) = self.shared.send(&message).await {
            self.shared.pending.lock().remove(&id);
            return Err(e);
        }

        let bound = timeout + REPLY_GRACE;
        match tokio::time::timeout(bound, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(fault))) => Err(E2eError::Browser {
                op: op.to_string(),
                name: fault.name,
                message: fault.message,
            }),
            Ok(Err(_)) => Err(E2eError::DriverClosed),
            Err(_) => {
                self.shared.pending.lock().remove(&id);
                Err(E2eError::Timeout(format!(
                    "host reply to '{}' after {} ms",
                    op,
                    bound.as_millis()
                )))
            }
        }
    }

    /// Open a fresh browsing context with one page
    pub async fn new_context(&self, options: &ContextOptions) -> E2eResult<Page> {
        let value = self
            .call(None, "new_context", serde_json::to_value(options)?, CONTROL_TIMEOUT)
            .await?;
        let context = value["context"]
            .as_u64()
            .ok_or_else(|| E2eError::Driver(format!("new_context returned no id: {}", value)))?;
        debug!("Opened browsing context {}", context);
        Ok(Page::new(self.clone(), context, options.expect_timeout))
    }

    pub(crate) async fn install_route(
        &self,
        context: u64,
        pattern: &str,
        handler: Arc<dyn RouteHandler>,
    ) -> E2eResult<u64> {
        let rule_id = self.shared.next_rule.fetch_add(1, Ordering::SeqCst);
        self.shared.routes.lock().insert((context, rule_id), handler);

        let installed = self
            .call(
                Some(context),
                "route",
                json!({ "rule_id": rule_id, "pattern": pattern }),
                CONTROL_TIMEOUT,
            )
            .await;
        if let Err(e) = installed {
            self.shared.routes.lock().remove(&(context, rule_id));
            return Err(e);
        }
        debug!("Installed route {} on context {}: {}", rule_id, context, pattern);
        Ok(rule_id)
    }

    /// Remove every rule of `context`. Safe to call repeatedly.
    pub(crate) async fn remove_routes(&self, context: u64) -> E2eResult<()> {
        // Forget the handlers first so in-flight events fall through to Continue.
        self.shared.routes.lock().retain(|(ctx, _), _| *ctx != context);
        match self
            .call(Some(context), "unroute_all", json!({}), CONTROL_TIMEOUT)
            .await
        {
            Ok(_) | Err(E2eError::DriverClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Rules currently registered for `context`
    pub fn active_routes(&self, context: u64) -> usize {
        self.shared
            .routes
            .lock()
            .keys()
            .filter(|(ctx, _)| *ctx == context)
            .count()
    }

    /// Close the browser and stop the host process
    pub async fn close(&self) {
        if !self.is_closed() {
            if let Err(e) = self.call(None, "close", json!({}), CONTROL_TIMEOUT).await {
                debug!("Browser close reported: {}", e);
            }
        }
        self.shared.mark_closed();

        let child = self.host.child.lock().take();
        if let Some(child) = child {
            stop_child(child).await;
        }
        for task in self.host.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

async fn check_node_installed(node: &str) -> E2eResult<()> {
    let status = Command::new(node)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

async fn reader_loop<R: AsyncRead + Unpin>(reader: R, shared: Arc<Shared>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match decode_line(&line) {
                    Ok(inbound) => dispatch(&shared, inbound).await,
                    Err(e) => warn!("Ignoring malformed host frame: {}", e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Reading from Playwright host failed: {}", e);
                break;
            }
        }
    }
    debug!("Playwright host closed its output");
    shared.mark_closed();
}

async fn dispatch(shared: &Shared, inbound: Inbound) {
    match inbound {
        Inbound::Response { id, ok, value, error } => {
            let reply = if ok {
                Ok(value)
            } else {
                Err(error.unwrap_or_else(|| BrowserFault {
                    name: "Error".to_string(),
                    message: "host reported a failure without detail".to_string(),
                }))
            };
            match shared.pending.lock().remove(&id) {
                Some(tx) => {
                    let _ = tx.send(reply);
                }
                None => debug!("Dropping reply {} with no waiter", id),
            }
        }
        Inbound::Route {
            route_id,
            context,
            rule_id,
            request,
        } => {
            let action = match shared.handler(context, rule_id) {
                Some(handler) => handler.on_request(&request),
                None => RouteAction::Continue,
            };
            debug!("{} {} -> {}", request.method, request.url, action_kind(&action));
            reply_route(shared, route_id, action).await;
        }
        Inbound::Upstream {
            route_id,
            context,
            rule_id,
            request,
            response,
            error,
        } => {
            let upstream = match (response, error) {
                (Some(response), _) => Ok(response),
                (None, Some(error)) => Err(error),
                (None, None) => Err("host sent neither response nor error".to_string()),
            };
            let action = match shared.handler(context, rule_id) {
                Some(handler) => handler.on_upstream(&request, upstream),
                None => match upstream {
                    Ok(response) => response.into(),
                    Err(_) => RouteAction::Continue,
                },
            };
            reply_route(shared, route_id, action).await;
        }
        Inbound::Log { level, message } => match level.as_str() {
            "warn" | "error" => warn!(target: "playwright", "{}", message),
            _ => debug!(target: "playwright", "{}", message),
        },
    }
}

async fn reply_route(shared: &Shared, route_id: u64, action: RouteAction) {
    if let Err(e) = shared.send(&Outbound::RouteReply { route_id, action }).await {
        warn!("Could not settle intercepted request {}: {}", route_id, e);
    }
}

fn action_kind(action: &RouteAction) -> &'static str {
    match action {
        RouteAction::Continue => "continue",
        RouteAction::Fetch => "fetch",
        RouteAction::Fulfill { .. } => "fulfill",
    }
}

async fn forward_stderr<R: AsyncRead + Unpin>(stderr: R) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "playwright", "{}", line);
    }
}

async fn stop_child(mut child: Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
            && tokio::time::timeout(Duration::from_secs(2), child.wait()).await.is_ok()
        {
            return;
        }
    }

    if let Err(e) = child.kill().await {
        debug!("Killing Playwright host failed: {}", e);
    }
}
