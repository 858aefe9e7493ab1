use std::time::Duration;

use tracing::debug;

use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::modals::{self, ModalFlag};

const START_BUTTON_TIMEOUT: Duration = Duration::from_secs(5);

/// Landing page and top navigation
pub struct HomePage {
    page: Page,
    play_link: Locator,
    play_bots_link: Locator,
    social_link: Locator,
    start_button: Locator,
}

impl HomePage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            play_link: Locator::css("a.nav-link-component").has_text("Play"),
            play_bots_link: Locator::role_named("link", "Play Bots"),
            social_link: Locator::css("a.nav-link-component").has_text("Social"),
            start_button: Locator::role_named("button", "Start"),
        }
    }

    pub async fn goto(&self) -> E2eResult<()> {
        self.page.goto("/").await
    }

    pub async fn open_play_menu(&self) -> E2eResult<()> {
        self.page.click(&self.play_link).await
    }

    pub async fn go_to_social(&self) -> E2eResult<()> {
        self.page.click(&self.social_link).await
    }

    /// Open the bots page and get past its intro modal
    pub async fn go_to_play_bots(&self) -> E2eResult<()> {
        self.page.click(&self.play_bots_link).await?;
        modals::dismiss(&self.page, &[ModalFlag::PlayVsComputerIntro]).await?;

        // The flag only helps on the next render; an already-open modal still needs "Start".
        if self.page.is_visible(&self.start_button, START_BUTTON_TIMEOUT).await {
            debug!("Closing bots intro modal");
            self.page.click(&self.start_button).await?;
        }
        Ok(())
    }
}
