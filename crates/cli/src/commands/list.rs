//! Scenario catalogue

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use chessqa_e2e::{scenarios, Project, ScenarioFilter};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ListArgs {
    /// Only scenarios of this project (ui-mocked, e2e-live, a11y-live)
    #[arg(long)]
    pub project: Option<Project>,
}

#[derive(Serialize)]
pub struct ScenarioInfo {
    pub name: &'static str,
    pub project: Project,
    pub title: &'static str,
}

impl TableDisplay for ScenarioInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Project", "Title"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.to_string(), self.project.to_string(), self.title.to_string()]
    }
}

pub fn execute(args: ListArgs, format: OutputFormat) -> Result<ExitCode> {
    let filter = ScenarioFilter {
        project: args.project,
        grep: None,
    };
    let rows: Vec<ScenarioInfo> = filter
        .apply(&scenarios::all())
        .into_iter()
        .map(|s| ScenarioInfo {
            name: s.name,
            project: s.project,
            title: s.title,
        })
        .collect();

    print_list(&rows, format);
    Ok(ExitCode::SUCCESS)
}
