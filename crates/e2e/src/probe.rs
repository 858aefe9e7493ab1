//! Ordered fallback probes
//!
//! Candidates are tried in order, each with its own short bound, and the
//! first visible one wins. A probe never fails: a missing or broken
//! candidate just hands over to the next.

use std::time::Duration;

use tracing::debug;

use crate::locator::Locator;
use crate::page::Page;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ProbeList {
    candidates: Vec<Locator>,
    timeout: Duration,
}

impl ProbeList {
    pub fn new<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = Locator>,
    {
        Self {
            candidates: candidates.into_iter().collect(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Bound applied to each candidate
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }

    /// First candidate that becomes visible, if any
    pub async fn first_visible(&self, page: &Page) -> Option<&Locator> {
        for candidate in &self.candidates {
            if page.is_visible(candidate, self.timeout).await {
                debug!("probe matched {}", candidate);
                return Some(candidate);
            }
        }
        None
    }
}
