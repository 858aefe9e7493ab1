//! Scenario runner: one browser, one context per attempt, bounded parallelism

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{E2eConfig, TraceMode};
use crate::driver::{ContextOptions, Driver};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::Fixtures;
use crate::page::Page;
use crate::session::SessionState;

/// Group of scenarios sharing a purpose and a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Project {
    /// Live site with friends endpoints intercepted
    UiMocked,
    /// Live site, no interception
    E2eLive,
    /// axe scans of the main navigation surfaces
    A11yLive,
}

impl Project {
    pub const ALL: [Project; 3] = [Project::UiMocked, Project::E2eLive, Project::A11yLive];

    pub fn name(&self) -> &'static str {
        match self {
            Project::UiMocked => "ui-mocked",
            Project::E2eLive => "e2e-live",
            Project::A11yLive => "a11y-live",
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Project {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Project::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| E2eError::InvalidConfig(format!("unknown project '{}'", s)))
    }
}

/// How a scenario that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Skipped(String),
}

pub type ScenarioFn = fn(Fixtures) -> BoxFuture<'static, E2eResult<Outcome>>;

#[derive(Clone, Copy)]
pub struct Scenario {
    /// Stable identifier, also used for trace file names
    pub name: &'static str,
    pub title: &'static str,
    pub project: Project,
    pub run: ScenarioFn,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("project", &self.project)
            .finish()
    }
}

/// Which scenarios to run
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    pub project: Option<Project>,
    pub grep: Option<Regex>,
}

impl ScenarioFilter {
    pub fn matches(&self, scenario: &Scenario) -> bool {
        if self.project.is_some_and(|p| p != scenario.project) {
            return false;
        }
        match &self.grep {
            Some(re) => re.is_match(scenario.name) || re.is_match(scenario.title),
            None => true,
        }
    }

    pub fn apply(&self, scenarios: &[Scenario]) -> Vec<Scenario> {
        scenarios.iter().filter(|s| self.matches(s)).copied().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    /// Failed first, passed on a retry
    Flaky,
}

/// Result of running a single scenario, retries included
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub project: Project,
    pub status: TestStatus,
    pub success: bool,
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traces: Vec<PathBuf>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub flaky: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    fn from_results(started_at: DateTime<Utc>, duration_ms: u64, results: Vec<TestResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            started_at,
            total: results.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            flaky: count(TestStatus::Flaky),
            duration_ms,
            results,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

struct Attempt {
    outcome: E2eResult<Outcome>,
    trace: Option<PathBuf>,
}

pub struct TestRunner {
    config: Arc<E2eConfig>,
}

impl TestRunner {
    pub fn new(config: E2eConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &E2eConfig {
        &self.config
    }

    /// Check the session snapshot, launch the browser and run `scenarios`.
    ///
    /// Errors here are harness failures; scenario failures are reported in
    /// the returned suite result.
    pub async fn run(&self, scenarios: &[Scenario]) -> E2eResult<TestSuiteResult> {
        SessionState::load(&self.config.storage_state)?;
        let driver = Driver::launch(&self.config).await?;
        let suite = self.run_with_driver(&driver, scenarios).await;
        driver.close().await;
        Ok(suite)
    }

    /// Run `scenarios` against an already running driver
    pub async fn run_with_driver(
        &self,
        driver: &Driver,
        scenarios: &[Scenario],
    ) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            "Running {} test(s) using {} worker(s)...",
            scenarios.len(),
            self.config.workers
        );

        let mut indexed: Vec<(usize, TestResult)> = stream::iter(scenarios.iter().enumerate())
            .map(|(index, scenario)| async move {
                (index, self.run_scenario(driver, scenario).await)
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<TestResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let suite = TestSuiteResult::from_results(started_at, elapsed_ms, results);
        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} flaky, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.flaky, suite.skipped, suite.duration_ms
        );
        suite
    }

    /// Run one scenario, retrying the whole of it in a fresh context
    pub async fn run_scenario(&self, driver: &Driver, scenario: &Scenario) -> TestResult {
        let start = Instant::now();
        let max_attempts = self.config.retries + 1;
        let mut traces = Vec::new();
        let mut last_error = None;
        let mut finished = None;
        let mut attempts = 0;

        for attempt in 1..=max_attempts {
            attempts = attempt;
            if attempt > 1 {
                info!("↻ {} (retry {}/{})", scenario.name, attempt - 1, self.config.retries);
            }
            let Attempt { outcome, trace } = self.run_attempt(driver, scenario, attempt).await;
            traces.extend(trace);
            match outcome {
                Ok(outcome) => {
                    finished = Some(outcome);
                    break;
                }
                Err(e) => {
                    warn!("{} attempt {} failed: {}", scenario.name, attempt, e);
                    let fatal = matches!(e, E2eError::DriverClosed);
                    last_error = Some(e.to_string());
                    if fatal {
                        break;
                    }
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let (status, skip_reason) = match finished {
            Some(Outcome::Passed) if attempts > 1 => (TestStatus::Flaky, None),
            Some(Outcome::Passed) => (TestStatus::Passed, None),
            Some(Outcome::Skipped(reason)) => (TestStatus::Skipped, Some(reason)),
            None => (TestStatus::Failed, None),
        };

        match status {
            TestStatus::Passed | TestStatus::Flaky => {
                info!("✓ {} ({} ms)", scenario.name, duration_ms)
            }
            TestStatus::Skipped => info!(
                "- {} skipped: {}",
                scenario.name,
                skip_reason.as_deref().unwrap_or_default()
            ),
            TestStatus::Failed => error!(
                "✗ {} - {}",
                scenario.name,
                last_error.as_deref().unwrap_or("unknown error")
            ),
        }

        TestResult {
            name: scenario.name.to_string(),
            project: scenario.project,
            status,
            success: status != TestStatus::Failed,
            attempts,
            duration_ms,
            error: if status == TestStatus::Failed { last_error } else { None },
            skip_reason,
            traces,
        }
    }

    async fn run_attempt(&self, driver: &Driver, scenario: &Scenario, attempt: u32) -> Attempt {
        debug!("Running {} attempt {}", scenario.name, attempt);
        let options = ContextOptions::from_config(&self.config, true);
        let page = match driver.new_context(&options).await {
            Ok(page) => page,
            Err(e) => {
                return Attempt {
                    outcome: Err(e),
                    trace: None,
                }
            }
        };

        let tracing = self.config.trace == TraceMode::RetainOnFailure
            && match page.start_tracing().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Tracing unavailable for {}: {}", scenario.name, e);
                    false
                }
            };

        let fixtures = Fixtures::new(page.clone(), self.config.clone());
        let run = (scenario.run)(fixtures);
        let outcome = match tokio::time::timeout(self.config.test_timeout(), run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(E2eError::Timeout(format!(
                "{} did not finish within {} ms",
                scenario.name, self.config.test_timeout_ms
            ))),
        };

        if let Err(e) = page.unroute_all().await {
            debug!("Route cleanup for {} reported: {}", scenario.name, e);
        }
        let trace = if tracing {
            self.finish_trace(&page, scenario, attempt, outcome.is_err()).await
        } else {
            None
        };
        if let Err(e) = page.close().await {
            debug!("Closing context for {} reported: {}", scenario.name, e);
        }

        Attempt { outcome, trace }
    }

    /// Keep the trace of a failed attempt, discard it otherwise
    async fn finish_trace(
        &self,
        page: &Page,
        scenario: &Scenario,
        attempt: u32,
        failed: bool,
    ) -> Option<PathBuf> {
        if !failed {
            if let Err(e) = page.stop_tracing(None).await {
                debug!("Discarding trace for {} reported: {}", scenario.name, e);
            }
            return None;
        }

        let path = trace_path(&self.config, scenario.name, attempt);
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Cannot create trace directory {}: {}", parent.display(), e);
            }
        }
        match page.stop_tracing(Some(&path)).await {
            Ok(()) => {
                info!("Trace saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not save trace for {}: {}", scenario.name, e);
                None
            }
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// `<output>/traces/<scenario>-attempt<N>.zip`
pub fn trace_path(config: &E2eConfig, scenario: &str, attempt: u32) -> PathBuf {
    config.trace_dir().join(format!("{}-attempt{}.zip", scenario, attempt))
}
