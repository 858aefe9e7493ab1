//! In-process stand-in for the Playwright host
//!
//! Speaks the same JSON-lines protocol as `driver.js` over a duplex pipe.
//! The page is a table of locator strings: what is visible, what text or
//! value it holds, and what a click does. Every command is recorded.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chessqa_e2e::{ContextOptions, Driver, E2eConfig, Locator, Page};
use parking_lot::{Mutex, MutexGuard};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

pub const BASE_URL: &str = "https://www.chess.com";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub op: String,
    pub context: Option<u64>,
    pub args: Value,
}

impl Recorded {
    pub fn locator(&self) -> Option<String> {
        locator_key(&self.args)
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    Navigate(String),
    Show(String),
    Hide(String),
}

#[derive(Default)]
pub struct FakeBrowser {
    pub url: String,
    pub visible: HashSet<String>,
    pub disabled: HashSet<String>,
    pub counts: HashMap<String, u64>,
    pub attributes: HashMap<(String, String), String>,
    pub texts: HashMap<String, String>,
    pub values: HashMap<String, String>,
    pub on_click: HashMap<String, Vec<Effect>>,
    /// Ops that answer with `(name, message)` instead of succeeding
    pub failures: HashMap<String, (String, String)>,
    pub storage_state: Value,
    pub axe: Option<Value>,
    pub commands: Vec<Recorded>,
    next_context: u64,
}

pub fn key(locator: &Locator) -> String {
    locator.to_string()
}

fn locator_key(args: &Value) -> Option<String> {
    serde_json::from_value::<Locator>(args.get("locator")?.clone())
        .ok()
        .map(|l| l.to_string())
}

fn timeout_error(what: &str) -> (String, String) {
    ("TimeoutError".to_string(), format!("Timeout exceeded waiting for {}", what))
}

impl FakeBrowser {
    pub fn show(&mut self, locator: &Locator) -> &mut Self {
        self.visible.insert(key(locator));
        self
    }

    pub fn hide(&mut self, locator: &Locator) -> &mut Self {
        self.visible.remove(&key(locator));
        self
    }

    pub fn set_text(&mut self, locator: &Locator, text: &str) -> &mut Self {
        self.texts.insert(key(locator), text.to_string());
        self
    }

    pub fn set_attribute(&mut self, locator: &Locator, name: &str, value: &str) -> &mut Self {
        self.attributes.insert((key(locator), name.to_string()), value.to_string());
        self
    }

    pub fn set_count(&mut self, locator: &Locator, count: u64) -> &mut Self {
        self.counts.insert(key(locator), count);
        self
    }

    pub fn on_click(&mut self, locator: &Locator, effect: Effect) -> &mut Self {
        self.on_click.entry(key(locator)).or_default().push(effect);
        self
    }

    pub fn fail(&mut self, op: &str, name: &str, message: &str) -> &mut Self {
        self.failures.insert(op.to_string(), (name.to_string(), message.to_string()));
        self
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Navigate(path) => self.url = resolve(&path),
            Effect::Show(k) => {
                self.visible.insert(k);
            }
            Effect::Hide(k) => {
                self.visible.remove(&k);
            }
        }
    }

    fn handle(&mut self, message: &Value) -> Value {
        let id = message["id"].as_u64().unwrap_or_default();
        let op = message["op"].as_str().unwrap_or_default().to_string();
        let args = message["args"].clone();
        self.commands.push(Recorded {
            op: op.clone(),
            context: message["context"].as_u64(),
            args: args.clone(),
        });

        match self.reply(&op, &args) {
            Ok(value) => json!({ "type": "response", "id": id, "ok": true, "value": value }),
            Err((name, message)) => json!({
                "type": "response", "id": id, "ok": false,
                "error": { "name": name, "message": message }
            }),
        }
    }

    fn reply(&mut self, op: &str, args: &Value) -> Result<Value, (String, String)> {
        if let Some(failure) = self.failures.get(op) {
            return Err(failure.clone());
        }
        let locator = locator_key(args).unwrap_or_default();

        match op {
            "launch" => Ok(json!({ "version": "fake" })),
            "new_context" => {
                self.next_context += 1;
                Ok(json!({ "context": self.next_context }))
            }
            "goto" => {
                self.url = resolve(args["url"].as_str().unwrap_or("/"));
                Ok(Value::Null)
            }
            "url" => Ok(json!(self.url)),
            "click" => {
                if let Some(effects) = self.on_click.get(&locator).cloned() {
                    for effect in effects {
                        self.apply(effect);
                    }
                }
                Ok(Value::Null)
            }
            "fill" => {
                self.values.insert(locator, args["value"].as_str().unwrap_or_default().to_string());
                Ok(Value::Null)
            }
            "clear" => {
                self.values.insert(locator, String::new());
                Ok(Value::Null)
            }
            "wait_for" => {
                let shown = self.visible.contains(&locator);
                let wanted = args["state"].as_str().unwrap_or("visible");
                let ok = match wanted {
                    "visible" | "attached" => shown,
                    _ => !shown,
                };
                if ok {
                    Ok(Value::Null)
                } else {
                    Err(timeout_error(&format!("{} to be {}", locator, wanted)))
                }
            }
            "is_visible" => Ok(json!(self.visible.contains(&locator))),
            "is_enabled" => Ok(json!(!self.disabled.contains(&locator))),
            "count" => {
                let fallback = u64::from(self.visible.contains(&locator));
                Ok(json!(self.counts.get(&locator).copied().unwrap_or(fallback)))
            }
            "get_attribute" => {
                let name = args["name"].as_str().unwrap_or_default().to_string();
                Ok(self
                    .attributes
                    .get(&(locator, name))
                    .map(|v| json!(v))
                    .unwrap_or(Value::Null))
            }
            "text_content" => Ok(self.texts.get(&locator).map(|t| json!(t)).unwrap_or(Value::Null)),
            "input_value" => Ok(json!(self.values.get(&locator).cloned().unwrap_or_default())),
            "storage_state" => Ok(self.storage_state.clone()),
            "axe_scan" => Ok(self
                .axe
                .clone()
                .unwrap_or_else(|| json!({ "url": self.url, "violations": [] }))),
            "tracing_stop" => {
                if let Some(path) = args["path"].as_str() {
                    std::fs::write(path, b"PK\x05\x06")
                        .map_err(|e| ("Error".to_string(), e.to_string()))?;
                }
                Ok(Value::Null)
            }
            _ => Ok(Value::Null),
        }
    }
}

fn respond(browser: &Mutex<FakeBrowser>, message: &Value) -> Value {
    browser.lock().handle(message)
}

fn resolve(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("{}{}", BASE_URL, url)
    }
}

pub struct FakeHost {
    pub driver: Driver,
    state: Arc<Mutex<FakeBrowser>>,
    inject: mpsc::UnboundedSender<Value>,
    replies: tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>,
    next_route: AtomicU64,
}

impl FakeHost {
    pub fn start() -> Self {
        let (driver_end, host_end) = tokio::io::duplex(1 << 20);
        let (driver_read, driver_write) = tokio::io::split(driver_end);
        let driver = Driver::from_transport(driver_read, driver_write);

        let state = Arc::new(Mutex::new(FakeBrowser {
            url: "about:blank".to_string(),
            ..Default::default()
        }));
        let (inject, mut injected) = mpsc::unbounded_channel::<Value>();
        let (reply_tx, replies) = mpsc::unbounded_channel::<Value>();

        let (host_read, mut host_write) = tokio::io::split(host_end);
        let browser = state.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(host_read).lines();
            loop {
                let frame = tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let message: Value = match serde_json::from_str(&line) {
                                Ok(message) => message,
                                Err(_) => continue,
                            };
                            match message["type"].as_str() {
                                Some("command") => respond(&browser, &message),
                                Some("route_reply") => {
                                    let _ = reply_tx.send(message);
                                    continue;
                                }
                                _ => continue,
                            }
                        }
                        _ => break,
                    },
                    Some(frame) = injected.recv() => frame,
                };
                let line = format!("{}\n", frame);
                if host_write.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        Self {
            driver,
            state,
            inject,
            replies: tokio::sync::Mutex::new(replies),
            next_route: AtomicU64::new(1),
        }
    }

    pub fn browser(&self) -> MutexGuard<'_, FakeBrowser> {
        self.state.lock()
    }

    /// A fresh context with a short assertion bound
    pub async fn page(&self) -> Page {
        let mut options = ContextOptions::from_config(&E2eConfig::default(), false);
        options.expect_timeout = Duration::from_millis(300);
        self.driver.new_context(&options).await.unwrap()
    }

    pub fn commands(&self) -> Vec<Recorded> {
        self.state.lock().commands.clone()
    }

    pub fn calls(&self, op: &str) -> Vec<Recorded> {
        self.commands().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn ops(&self) -> Vec<String> {
        self.commands().into_iter().map(|c| c.op).collect()
    }

    /// `(rule_id, pattern)` of every rule installed on `context`
    pub fn rules(&self, context: u64) -> Vec<(u64, String)> {
        self.calls("route")
            .into_iter()
            .filter(|c| c.context == Some(context))
            .map(|c| {
                (
                    c.args["rule_id"].as_u64().unwrap(),
                    c.args["pattern"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    async fn next_reply(&self, route_id: u64) -> Value {
        let mut replies = self.replies.lock().await;
        loop {
            let reply = tokio::time::timeout(Duration::from_secs(5), replies.recv())
                .await
                .expect("no route reply within 5 s")
                .expect("reply channel closed");
            if reply["route_id"].as_u64() == Some(route_id) {
                return reply;
            }
        }
    }

    /// Push a request through rule `rule_id` and return how it was settled.
    ///
    /// When the harness asks for the real response, `upstream` stands in for
    /// it: `Ok(response)` or `Err(network error)`.
    pub async fn intercept(
        &self,
        context: u64,
        rule_id: u64,
        method: &str,
        url: &str,
        upstream: Option<Result<Value, String>>,
    ) -> Value {
        let route_id = self.next_route.fetch_add(1, Ordering::SeqCst);
        let request = json!({ "url": url, "method": method });
        self.inject
            .send(json!({
                "type": "route", "route_id": route_id, "context": context,
                "rule_id": rule_id, "request": request
            }))
            .unwrap();

        let reply = self.next_reply(route_id).await;
        if reply["action"]["kind"] != "fetch" {
            return reply["action"].clone();
        }

        let mut frame = json!({
            "type": "upstream", "route_id": route_id, "context": context,
            "rule_id": rule_id, "request": request
        });
        match upstream {
            Some(Ok(response)) => frame["response"] = response,
            Some(Err(error)) => frame["error"] = json!(error),
            None => frame["error"] = json!("no upstream scripted"),
        }
        self.inject.send(frame).unwrap();
        self.next_reply(route_id).await["action"].clone()
    }
}
