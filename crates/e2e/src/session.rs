//! Persisted authentication snapshot
//!
//! The shape is Playwright's storage-state JSON, so a file written here can be
//! handed straight back to `browser.newContext({ storageState })`.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix seconds; `-1` marks a session cookie
    #[serde(default = "session_cookie_expiry")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn session_cookie_expiry() -> f64 {
    -1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn is_session(&self) -> bool {
        self.expires < 0.0
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_session() && self.expires < now.timestamp() as f64
    }
}

impl SessionState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }

    /// Persistent cookies whose expiry has passed
    pub fn expired_cookies(&self, now: DateTime<Utc>) -> Vec<&Cookie> {
        self.cookies.iter().filter(|c| c.is_expired_at(now)).collect()
    }

    /// True when the snapshot still carries something that can authenticate
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.cookies.iter().any(|c| !c.is_expired_at(now))
    }

    pub fn load(path: &Path) -> E2eResult<Self> {
        if !path.exists() {
            return Err(E2eError::SessionState(format!(
                "{} not found; run `chessqa setup-auth` first",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&content).map_err(|e| {
            E2eError::SessionState(format!("{} is not a storage state: {}", path.display(), e))
        })?;

        if !state.is_usable_at(Utc::now()) {
            warn!(
                "Session state at {} has no live cookies; authenticated scenarios will likely fail",
                path.display()
            );
        }
        Ok(state)
    }

    /// Write atomically: readers see either the old file or the complete new one
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(self)?)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| E2eError::Io(e.error))?;

        info!("Session state saved to {}", path.display());
        Ok(())
    }
}
