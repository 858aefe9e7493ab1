//! Suite configuration
//!
//! Values are layered: built-in defaults, then an optional `chessqa.toml`,
//! then environment variables. The CLI applies its flags on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

pub const DEFAULT_BASE_URL: &str = "https://www.chess.com";
pub const DEFAULT_USERNAME: &str = "chessTester1122";
pub const DEFAULT_PASSWORD: &str = "Pass1234!";
pub const DEFAULT_STORAGE_STATE: &str = "auth-state.json";
pub const DEFAULT_CONFIG_FILE: &str = "chessqa.toml";

/// Browser engine launched by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(E2eError::InvalidConfig(format!("unknown browser '{}'", other))),
        }
    }
}

/// When to keep Playwright traces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceMode {
    Off,
    #[default]
    RetainOnFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    /// Site under test
    pub base_url: String,

    /// Credentials used by the bootstrap and the live login scenario
    pub username: String,
    pub password: String,

    /// Persisted session snapshot loaded into every context
    pub storage_state: PathBuf,

    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Scenarios executed concurrently
    pub workers: usize,

    /// Whole-scenario retries after a failure
    pub retries: u32,

    /// Report and trace directory
    pub output_dir: PathBuf,

    pub trace: TraceMode,

    /// Node.js executable used to host Playwright
    pub node_binary: String,

    /// Default bound for assertions
    pub expect_timeout_ms: u64,

    /// Default bound for navigations
    pub navigation_timeout_ms: u64,

    /// Bound for one scenario attempt, teardown excluded
    pub test_timeout_ms: u64,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            storage_state: PathBuf::from(DEFAULT_STORAGE_STATE),
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            workers: default_workers(),
            retries: 0,
            output_dir: PathBuf::from("test-results"),
            trace: TraceMode::RetainOnFailure,
            node_binary: "node".to_string(),
            expect_timeout_ms: 5_000,
            navigation_timeout_ms: 30_000,
            test_timeout_ms: 90_000,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

impl E2eConfig {
    /// Load configuration from an optional file, then the process environment
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment overrides using `lookup` for each variable
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if lookup("CI").is_some_and(|v| !v.is_empty() && v != "0" && v != "false") {
            self.retries = 2;
            self.workers = 1;
        }
        if let Some(url) = first(&["baseUrl", "CHESSQA_BASE_URL"]) {
            self.base_url = url;
        }
        if let Some(user) = first(&["userName", "CHESSQA_USERNAME"]) {
            self.username = user;
        }
        if let Some(pass) = first(&["password", "CHESSQA_PASSWORD"]) {
            self.password = pass;
        }
        if let Some(path) = first(&["CHESSQA_STORAGE_STATE"]) {
            self.storage_state = PathBuf::from(path);
        }
        if let Some(browser) = first(&["CHESSQA_BROWSER"]) {
            self.browser = browser.parse()?;
        }
        if let Some(headed) = first(&["CHESSQA_HEADED"]) {
            self.headless = !matches!(headed.as_str(), "1" | "true" | "yes");
        }
        if let Some(workers) = first(&["CHESSQA_WORKERS"]) {
            self.workers = parse_number("CHESSQA_WORKERS", &workers)?;
        }
        if let Some(retries) = first(&["CHESSQA_RETRIES"]) {
            self.retries = parse_number("CHESSQA_RETRIES", &retries)?;
        }
        if let Some(timeout) = first(&["CHESSQA_TEST_TIMEOUT_MS"]) {
            self.test_timeout_ms = parse_number("CHESSQA_TEST_TIMEOUT_MS", &timeout)?;
        }
        if let Some(node) = first(&["CHESSQA_NODE"]) {
            self.node_binary = node;
        }
        self.validate()
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::InvalidConfig(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.workers == 0 {
            return Err(E2eError::InvalidConfig("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn expect_timeout(&self) -> Duration {
        Duration::from_millis(self.expect_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    /// Where traces of failed attempts are written
    pub fn trace_dir(&self) -> PathBuf {
        self.output_dir.join("traces")
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> E2eResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| E2eError::InvalidConfig(format!("{} must be a number, got '{}'", key, value)))
}
