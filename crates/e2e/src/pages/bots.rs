//! Bot selection on the play-vs-computer page
//!
//! A game against a bot moves through
//! `Idle → BeginnerSectionExpanded → BotChosen → GameRequested → GameBoardVisible`.
//! Each transition is one action below; nothing is retried.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::modals::{self, ModalFlag};

const BOARD_ALREADY_VISIBLE_TIMEOUT: Duration = Duration::from_secs(2);
const BOARD_TIMEOUT: Duration = Duration::from_secs(10);
const LOCKED_MODAL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BotLock {
    #[default]
    Unlocked,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotFlowState {
    Idle,
    BeginnerSectionExpanded,
    BotChosen,
    GameRequested,
    GameBoardVisible,
}

pub struct BotsPage {
    page: Page,
    beginner_section: Locator,
    beginner_bots: Locator,
    lock_glyph: Locator,
    play_button: Locator,
    game_board: Locator,
    state: Mutex<BotFlowState>,
}

impl BotsPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            beginner_section: Locator::css(r#"[data-cy="bot-group-Beginner"]"#),
            beginner_bots: Locator::css(r#"li[data-bot-classification="beginner"]"#),
            lock_glyph: Locator::css(r#"[data-glyph="tool-lock-closed"]"#),
            play_button: Locator::role_named("button", "Play"),
            game_board: Locator::css("#board-play-computer"),
            state: Mutex::new(BotFlowState::Idle),
        }
    }

    pub fn state(&self) -> BotFlowState {
        *self.state.lock()
    }

    fn advance(&self, next: BotFlowState) {
        *self.state.lock() = next;
    }

    pub async fn handle_modals(&self) -> E2eResult<()> {
        modals::dismiss(&self.page, &[ModalFlag::PlayVsComputerIntro]).await
    }

    async fn expand_beginner_section(&self) -> E2eResult<()> {
        self.page.click(&self.beginner_section).await?;
        self.advance(BotFlowState::BeginnerSectionExpanded);
        Ok(())
    }

    fn candidates(&self, lock: BotLock) -> Locator {
        match lock {
            BotLock::Locked => self.beginner_bots.clone().has(self.lock_glyph.clone()),
            BotLock::Unlocked => self.beginner_bots.clone().has_not(self.lock_glyph.clone()),
        }
    }

    /// Choose the first beginner bot with the requested lock state and return its name.
    ///
    /// Fails with [`E2eError::NoSuchBot`] before clicking anything when no bot matches.
    pub async fn select_bot(&self, lock: BotLock) -> E2eResult<String> {
        self.expand_beginner_section().await?;

        // Let the section render before deciding that it is empty.
        let any_bot = self.beginner_bots.clone().first();
        self.page.is_visible(&any_bot, self.page.expect_timeout()).await;

        let candidates = self.candidates(lock);
        if self.page.count(&candidates).await? == 0 {
            return Err(E2eError::NoSuchBot {
                locked: lock == BotLock::Locked,
            });
        }

        let bot = candidates.first();
        self.page.click(&bot).await?;
        self.advance(BotFlowState::BotChosen);

        let name = match self.page.get_attribute(&bot, "data-bot-selection-name").await? {
            Some(name) if !name.is_empty() => name,
            _ => match self.page.get_attribute(&bot, "data-cy").await? {
                Some(name) if !name.is_empty() => name,
                _ => "Unknown Bot".to_string(),
            },
        };
        info!("Selected bot: {}", name);
        Ok(name)
    }

    /// Press "Play" unless a game is already on the board.
    ///
    /// A click that does not bring up the board is logged, not raised; the
    /// game assertions that follow report the real problem.
    pub async fn start_game(&self) -> E2eResult<()> {
        if self
            .page
            .is_visible(&self.game_board, BOARD_ALREADY_VISIBLE_TIMEOUT)
            .await
        {
            info!("Game is already started");
            self.advance(BotFlowState::GameBoardVisible);
            return Ok(());
        }

        self.page
            .expect_enabled(&self.play_button)
            .await
            .map_err(|e| e.context("Play button"))?;

        if let Err(e) = self.page.click(&self.play_button).await {
            warn!("Play button not clickable, continuing: {}", e);
            return Ok(());
        }
        self.advance(BotFlowState::GameRequested);

        match self
            .page
            .expect_visible_within(&self.game_board, BOARD_TIMEOUT)
            .await
        {
            Ok(()) => self.advance(BotFlowState::GameBoardVisible),
            Err(e) => warn!("Game board did not appear after Play, continuing: {}", e),
        }
        Ok(())
    }

    /// The premium upsell shown when a locked bot is chosen
    pub async fn expect_locked_bot_modal(&self) -> E2eResult<()> {
        let modal = Locator::css(r#"[role="dialog"]"#).has_text("Bot Locked");
        self.page
            .expect_visible_within(&modal, LOCKED_MODAL_TIMEOUT)
            .await
            .map_err(|e| e.context("Locked bot dialog"))?;

        let parts = [
            ("modal title", Locator::role_named("heading", "Bot Locked")),
            ("modal subtitle", Locator::text("Try Premium for Free.")),
            ("free trial link", Locator::role_named("link", "Try Free for 7 days")),
            ("dismiss button", Locator::role_named("button", "No Thanks")),
        ];
        for (what, locator) in &parts {
            self.page
                .expect_visible(locator)
                .await
                .map_err(|e| e.context(what))?;
        }
        info!("Locked bot modal verified");
        Ok(())
    }
}
