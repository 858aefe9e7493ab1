//! chessqa browser test suite
//!
//! This crate drives chess.com through Playwright from Rust:
//! - Hosts Playwright in a Node.js child process and talks JSON lines to it
//! - Wraps the site in page objects with bounded, self-describing assertions
//! - Intercepts the friends endpoints to serve mocked or rewritten data
//! - Runs the scenario catalogue with retries, traces and a JSON report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── Driver::launch() -> Driver (node + driver.js)        │
//! │    ├── new_context() -> Page       one per attempt          │
//! │    ├── Fixtures { home, bots, game, social, friends, auth } │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver bridge                                              │
//! │    ├── command/response, multiplexed by request id          │
//! │    └── route events -> RouteHandler (mocks::RouteRule)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenarios                                                  │
//! │    ├── ui-mocked   friends list against mocked endpoints    │
//! │    ├── e2e-live    login, bots, friend search               │
//! │    └── a11y-live   axe scans of the navigation surfaces     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod a11y;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod locator;
pub mod mocks;
pub mod page;
pub mod pages;
pub mod probe;
pub mod runner;
pub mod scenarios;
pub mod session;

pub use auth::{AuthHelper, LogoutOutcome};
pub use config::{BrowserKind, E2eConfig, TraceMode};
pub use driver::{ContextOptions, Driver, RouteHandler};
pub use error::{E2eError, E2eResult};
pub use fixtures::Fixtures;
pub use locator::Locator;
pub use page::{LoadState, Page, WaitState};
pub use runner::{
    Outcome, Project, Scenario, ScenarioFilter, TestResult, TestRunner, TestStatus, TestSuiteResult,
};
pub use session::SessionState;
