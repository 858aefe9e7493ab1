//! Per-scenario page objects
//!
//! One [`Fixtures`] value wraps one browsing context. Page objects are built
//! on first use and live as long as the scenario attempt.

use std::future::Future;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::auth::AuthHelper;
use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::pages::{BotsPage, FriendsPage, GamePage, HomePage, SocialPage};

pub struct Fixtures {
    page: Page,
    config: Arc<E2eConfig>,
    home: OnceCell<HomePage>,
    bots: OnceCell<BotsPage>,
    game: OnceCell<GamePage>,
    social: OnceCell<SocialPage>,
    friends: OnceCell<FriendsPage>,
    auth: OnceCell<AuthHelper>,
}

impl Fixtures {
    pub fn new(page: Page, config: Arc<E2eConfig>) -> Self {
        Self {
            page,
            config,
            home: OnceCell::new(),
            bots: OnceCell::new(),
            game: OnceCell::new(),
            social: OnceCell::new(),
            friends: OnceCell::new(),
            auth: OnceCell::new(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn config(&self) -> &E2eConfig {
        &self.config
    }

    pub fn home(&self) -> &HomePage {
        self.home.get_or_init(|| HomePage::new(self.page.clone()))
    }

    pub fn bots(&self) -> &BotsPage {
        self.bots.get_or_init(|| BotsPage::new(self.page.clone()))
    }

    pub fn game(&self) -> &GamePage {
        self.game.get_or_init(|| GamePage::new(self.page.clone()))
    }

    pub fn social(&self) -> &SocialPage {
        self.social.get_or_init(|| SocialPage::new(self.page.clone()))
    }

    pub fn friends(&self) -> &FriendsPage {
        self.friends.get_or_init(|| FriendsPage::new(self.page.clone()))
    }

    pub fn auth(&self) -> &AuthHelper {
        self.auth.get_or_init(|| AuthHelper::new(self.page.clone()))
    }

    /// Names of the page objects built so far
    pub fn constructed(&self) -> Vec<&'static str> {
        let cells = [
            ("home", self.home.get().is_some()),
            ("bots", self.bots.get().is_some()),
            ("game", self.game.get().is_some()),
            ("social", self.social.get().is_some()),
            ("friends", self.friends.get().is_some()),
            ("auth", self.auth.get().is_some()),
        ];
        cells.iter().filter(|(_, built)| *built).map(|(name, _)| *name).collect()
    }

    /// Run one named step; a failure is reported as [`E2eError::StepFailed`]
    pub async fn step<T, F>(&self, name: &str, step: F) -> E2eResult<T>
    where
        F: Future<Output = E2eResult<T>>,
    {
        info!("  step: {}", name);
        step.await.map_err(|e| {
            error!("  step '{}' failed: {}", name, e);
            match e {
                E2eError::StepFailed { .. }
                | E2eError::NoSuchBot { .. }
                | E2eError::DriverClosed => e,
                other => E2eError::StepFailed {
                    step: name.to_string(),
                    reason: other.to_string(),
                },
            }
        })
    }
}
