//! Output formatting for CLI

use std::path::Path;

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use chessqa_e2e::{TestResult, TestStatus, TestSuiteResult};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;

    /// Cells for the table view; plain strings unless overridden
    fn cells(&self) -> Vec<Cell> {
        self.row().into_iter().map(Cell::new).collect()
    }
}

impl TableDisplay for TestResult {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Project", "Status", "Attempts", "Duration", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        let detail = match self.status {
            TestStatus::Skipped => self.skip_reason.clone().unwrap_or_default(),
            _ => self.error.clone().unwrap_or_default(),
        };
        vec![
            self.name.clone(),
            self.project.to_string(),
            status_label(self.status).to_string(),
            self.attempts.to_string(),
            format!("{} ms", self.duration_ms),
            detail,
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.row().into_iter().map(Cell::new).collect();
        cells[2] = Cell::new(status_label(self.status)).fg(status_color(self.status));
        cells
    }
}

fn status_label(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "passed",
        TestStatus::Failed => "failed",
        TestStatus::Skipped => "skipped",
        TestStatus::Flaky => "flaky",
    }
}

fn status_color(status: TestStatus) -> Color {
    match status {
        TestStatus::Passed => Color::Green,
        TestStatus::Failed => Color::Red,
        TestStatus::Skipped => Color::DarkGrey,
        TestStatus::Flaky => Color::Yellow,
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No items found.");
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.cells());
            }

            println!("{table}");
        }
        OutputFormat::Json => match serde_json::to_string_pretty(items) {
            Ok(json) => println!("{}", json),
            Err(e) => print_error(&format!("Cannot encode output: {}", e)),
        },
        OutputFormat::Yaml => match serde_yaml::to_string(items) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => print_error(&format!("Cannot encode output: {}", e)),
        },
    }
}

/// One-line totals after a run; silent for machine-readable formats
pub fn print_summary(suite: &TestSuiteResult, report: &Path, format: OutputFormat) {
    if !matches!(format, OutputFormat::Table) {
        return;
    }

    println!();
    let mut parts = vec![format!("{} passed", suite.passed).green().to_string()];
    if suite.failed > 0 {
        parts.push(format!("{} failed", suite.failed).red().bold().to_string());
    }
    if suite.flaky > 0 {
        parts.push(format!("{} flaky", suite.flaky).yellow().to_string());
    }
    if suite.skipped > 0 {
        parts.push(format!("{} skipped", suite.skipped).dimmed().to_string());
    }
    println!(
        "  {} {}",
        parts.join(", "),
        format!("({} ms)", suite.duration_ms).dimmed()
    );

    let traces: usize = suite.results.iter().map(|r| r.traces.len()).sum();
    if traces > 0 {
        print_info(&format!(
            "{} trace(s) kept; open with: npx playwright show-trace <file>",
            traces
        ));
    }
    print_info(&format!("Report: {}", report.display()));
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessqa_e2e::Project;

    fn result(status: TestStatus) -> TestResult {
        TestResult {
            name: "bot-locked-modal".to_string(),
            project: Project::E2eLive,
            status,
            success: status != TestStatus::Failed,
            attempts: 1,
            duration_ms: 420,
            error: Some("Assertion failed: modal title".to_string()),
            skip_reason: Some("No locked bots available for this account".to_string()),
            traces: vec![],
        }
    }

    #[test]
    fn detail_column_follows_status() {
        let skipped = result(TestStatus::Skipped).row();
        assert_eq!(skipped[2], "skipped");
        assert_eq!(skipped[5], "No locked bots available for this account");

        let failed = result(TestStatus::Failed).row();
        assert_eq!(failed[1], "e2e-live");
        assert_eq!(failed[4], "420 ms");
        assert_eq!(failed[5], "Assertion failed: modal title");
    }

    #[test]
    fn table_row_matches_headers() {
        let item = result(TestStatus::Passed);
        assert_eq!(item.cells().len(), TestResult::headers().len());
    }
}
