//! Error types for browser tests

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Run: npm install playwright && npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Driver process exited")]
    DriverClosed,

    #[error("Browser error in {op}: {name}: {message}")]
    Browser {
        op: String,
        name: String,
        message: String,
    },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Authentication did not complete: {signal}")]
    AuthenticationTimeout { signal: String },

    #[error("No beginner bot available matching locked={locked}")]
    NoSuchBot { locked: bool },

    #[error("Session state error: {0}")]
    SessionState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Accessibility scan found {count} violation(s): {summary}")]
    Accessibility { count: usize, summary: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl E2eError {
    /// True for errors raised by Playwright because a wait ran out.
    pub fn is_timeout(&self) -> bool {
        match self {
            E2eError::Timeout(_) => true,
            E2eError::Browser { name, .. } => name == "TimeoutError",
            _ => false,
        }
    }

    /// Prefix an assertion failure with what the check was about
    pub fn context(self, what: &str) -> Self {
        match self {
            E2eError::AssertionFailed(message) => {
                E2eError::AssertionFailed(format!("{}: {}", what, message))
            }
            other => other,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
