//! Accessibility scans through axe-core

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::Page;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxeReport {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub violations: Vec<AxeViolation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxeViolation {
    pub id: String,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub help_url: String,
    #[serde(default)]
    pub nodes: Vec<AxeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxeNode {
    #[serde(default)]
    pub target: Vec<serde_json::Value>,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub failure_summary: Option<String>,
}

impl AxeReport {
    /// One line per rule: `id (impact): help [n node(s)]`
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| {
                format!(
                    "{} ({}): {} [{} node(s)]",
                    v.id,
                    v.impact.as_deref().unwrap_or("unknown"),
                    v.help,
                    v.nodes.len()
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Run axe against whatever the page currently shows
pub async fn scan(page: &Page) -> E2eResult<AxeReport> {
    let value = page.axe_scan().await?;
    let report: AxeReport = serde_json::from_value(value)?;
    info!("Accessibility scan of {}: {} violation(s)", report.url, report.violations.len());
    Ok(report)
}

pub async fn expect_no_violations(page: &Page) -> E2eResult<()> {
    let report = scan(page).await?;
    if report.violations.is_empty() {
        return Ok(());
    }
    for violation in &report.violations {
        warn!("{}: {} ({})", violation.id, violation.description, violation.help_url);
    }
    Err(E2eError::Accessibility {
        count: report.violations.len(),
        summary: report.summary(),
    })
}
