use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::modals::{self, ModalFlag};

pub struct SocialPage {
    page: Page,
    social_link: Locator,
    friends_link: Locator,
}

impl SocialPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            social_link: Locator::role_named("link", "Social"),
            friends_link: Locator::role_named("link", "Friends Find and add friends"),
        }
    }

    pub async fn goto(&self) -> E2eResult<()> {
        self.page.goto("/").await
    }

    pub async fn open_social_menu(&self) -> E2eResult<()> {
        self.page.click(&self.social_link).await
    }

    pub async fn go_to_friends(&self) -> E2eResult<()> {
        modals::dismiss(
            &self.page,
            &[ModalFlag::PlayVsComputerIntro, ModalFlag::SocialIntro],
        )
        .await?;
        self.page.click(&self.friends_link).await
    }
}
