//! The scenario catalogue, grouped by project

pub mod accessibility;
pub mod live;
pub mod ui;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{E2eError, E2eResult};
use crate::fixtures::Fixtures;
use crate::runner::Scenario;

static CHESS_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"chess\.com").unwrap());
static SOCIAL_URL: Lazy<Regex> = Lazy::new(|| Regex::new("social").unwrap());
static FRIENDS_URL: Lazy<Regex> = Lazy::new(|| Regex::new("friends").unwrap());
static LOGIN_URL: Lazy<Regex> = Lazy::new(|| Regex::new("login").unwrap());
static PLAY_COMPUTER_URL: Lazy<Regex> = Lazy::new(|| Regex::new("play/computer").unwrap());

/// Every scenario in declaration order
pub fn all() -> Vec<Scenario> {
    let mut scenarios = ui::scenarios();
    scenarios.extend(live::scenarios());
    scenarios.extend(accessibility::scenarios());
    scenarios
}

/// Home, then Social, then Friends, checking the URL after each hop
async fn navigate_to_friends(fx: &Fixtures) -> E2eResult<()> {
    let page = fx.page();
    fx.step("Navigate to Social > Friends", async {
        fx.social().goto().await?;
        page.expect_url(&CHESS_URL).await?;
        fx.social().open_social_menu().await?;
        page.expect_url(&SOCIAL_URL).await?;
        fx.social().go_to_friends().await?;
        page.expect_url(&FRIENDS_URL).await
    })
    .await
}

fn require(condition: bool, message: impl Into<String>) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let scenarios = all();
        let names: HashSet<_> = scenarios.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), scenarios.len());
    }

    #[test]
    fn every_project_has_scenarios() {
        let scenarios = all();
        for project in crate::runner::Project::ALL {
            assert!(scenarios.iter().any(|s| s.project == project), "{} is empty", project);
        }
    }
}
