use tracing::debug;

use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;

/// A running game against a bot
pub struct GamePage {
    page: Page,
    chat: Locator,
    opponent: Locator,
    board: Locator,
    bot_message: Locator,
}

impl GamePage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            chat: Locator::css(".bot-speech-multiple-messages-component"),
            opponent: Locator::css("#player-top"),
            board: Locator::css("#board-play-computer"),
            bot_message: Locator::css(".bot-speech-content-botMessage"),
        }
    }

    /// Chat panel and board are up, and the top player strip names the bot
    pub async fn expect_chat_visible_for_bot(&self, bot_name: &str) -> E2eResult<()> {
        self.page.expect_visible(&self.chat).await.map_err(|e| e.context("bot chat"))?;
        self.page.expect_visible(&self.board).await.map_err(|e| e.context("game board"))?;
        self.page
            .expect_contains_text(&self.opponent, bot_name)
            .await
            .map_err(|e| e.context("opponent name"))
    }

    pub async fn expect_bot_message(&self, expected: &str) -> E2eResult<()> {
        self.page.expect_text(&self.bot_message, expected).await
    }

    /// Current speech bubble text, empty when there is none
    pub async fn bot_message(&self) -> E2eResult<String> {
        let text = self.page.text_content(&self.bot_message).await?.unwrap_or_default();
        debug!("Bot says: {}", text);
        Ok(text)
    }

    pub async fn expect_game_started(&self) -> E2eResult<()> {
        self.page.expect_visible(&self.board).await.map_err(|e| e.context("game board"))?;
        self.page.expect_visible(&self.chat).await.map_err(|e| e.context("bot chat"))
    }
}
