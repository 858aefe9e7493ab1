//! Friends list under the social area

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{LoadState, Page};
use crate::probe::ProbeList;

pub const SEARCH_PLACEHOLDER: &str = "Search by name or username";
pub const CONFIRM_REMOVAL_MESSAGE: &str =
    "Are you sure you want to remove this friend from your list?";
pub const REMOVAL_ALERT_FRAGMENT: &str = "has been removed from your friends list";
pub const EMPTY_STATE_TITLE: &str = "Chess is better with friends!";
pub const EMPTY_STATE_HINT: &str = "Add friends and their names will appear here.";

const SEARCH_VALUE_TIMEOUT: Duration = Duration::from_secs(15);
const SEARCH_RESULTS_TIMEOUT: Duration = Duration::from_secs(10);
const EMPTY_LIST_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

static FRIENDS_URL: Lazy<Regex> = Lazy::new(|| Regex::new("friends").unwrap());

pub struct FriendsPage {
    page: Page,
    friends_list: Locator,
    search_input: Locator,
    list_items: Locator,
    show_options: Locator,
    remove_friend: Locator,
    confirm_modal: Locator,
    confirm_message: Locator,
    confirm_cancel: Locator,
    confirm_yes: Locator,
    alert_container: Locator,
    alert_message: Locator,
}

impl FriendsPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            friends_list: Locator::css("main").has_text("Friends"),
            search_input: Locator::css(format!(r#"input[placeholder="{}"]"#, SEARCH_PLACEHOLDER)),
            list_items: Locator::css(".users-list-item"),
            show_options: Locator::css(
                r#"button[aria-label="Show options"].friends-actions-toggle"#,
            )
            .first(),
            remove_friend: Locator::css(r#"span.friends-actions-text:has-text("Remove Friend")"#)
                .first(),
            confirm_modal: Locator::css(".cc-modal-dialog .confirm-popover-body"),
            confirm_message: Locator::css(".confirm-popover-messageLabel"),
            confirm_cancel: Locator::css(r#".confirm-popover-buttons button:has-text("Cancel")"#),
            confirm_yes: Locator::css(r#".confirm-popover-buttons button:has-text("Yes")"#),
            alert_container: Locator::css("#widget-alert-flash.alerts-container"),
            alert_message: Locator::css(".alerts-message"),
        }
    }

    pub fn search_input(&self) -> &Locator {
        &self.search_input
    }

    pub async fn expect_friends_loaded(&self) -> E2eResult<()> {
        self.page.wait_for_load_state(LoadState::DomContentLoaded).await?;
        self.page.expect_url(&FRIENDS_URL).await?;
        self.page
            .expect_visible(&Locator::css("h1").has_text("Friends"))
            .await
            .map_err(|e| e.context("friends heading"))?;
        self.page
            .expect_visible(&self.friends_list)
            .await
            .map_err(|e| e.context("friends container"))
    }

    pub async fn expect_friends_list_visible(&self) -> E2eResult<()> {
        self.page.expect_visible(&self.friends_list).await
    }

    /// The friend shows up under one of the known markups, or the list is
    /// legitimately empty.
    pub async fn expect_friend_in_list(&self, name: &str) -> E2eResult<()> {
        let probes = ProbeList::new([
            Locator::css(format!(r#"a[href*="/member/{}"]"#, name)),
            Locator::css(format!("text={}", name)),
            Locator::css(format!(r#"[data-testid="friend-{}"]"#, name)),
        ]);
        if let Some(found) = probes.first_visible(&self.page).await {
            return self.page.expect_visible(found).await;
        }

        let empty =
            ProbeList::new([Locator::css("text=No friends"), Locator::css("text=Add friends")])
                .with_timeout(EMPTY_LIST_PROBE_TIMEOUT);
        if empty.first_visible(&self.page).await.is_some() {
            info!("No friends found in list, but friends page loaded correctly");
            return Ok(());
        }
        Err(E2eError::AssertionFailed(format!("Friend {} not found in friends list", name)))
    }

    pub async fn friends_count(&self) -> E2eResult<usize> {
        self.page.count(&self.list_items).await
    }

    pub async fn search_for_friend(&self, term: &str) -> E2eResult<()> {
        self.page.fill(&self.search_input, term).await?;
        self.page
            .expect_value_within(&self.search_input, term, SEARCH_VALUE_TIMEOUT)
            .await
    }

    pub async fn clear_search(&self) -> E2eResult<()> {
        self.page.clear(&self.search_input).await?;
        self.page.expect_value(&self.search_input, "").await
    }

    pub async fn search_input_value(&self) -> E2eResult<String> {
        self.page.input_value(&self.search_input).await
    }

    pub async fn expect_search_input_visible(&self) -> E2eResult<()> {
        self.page.expect_visible(&self.search_input).await?;
        self.page
            .expect_attribute(&self.search_input, "placeholder", SEARCH_PLACEHOLDER)
            .await
    }

    pub async fn expect_search_results_visible(&self, username: &str) -> E2eResult<()> {
        self.page
            .expect_visible_within(&self.list_items.clone().first(), SEARCH_RESULTS_TIMEOUT)
            .await
            .map_err(|e| e.context("search results"))?;
        self.page
            .expect_visible_within(&Locator::exact_text(username), SEARCH_RESULTS_TIMEOUT)
            .await
            .map_err(|e| e.context(username))
    }

    pub async fn click_show_options(&self) -> E2eResult<()> {
        self.page.click(&self.show_options).await
    }

    pub async fn expect_show_options_visible(&self) -> E2eResult<()> {
        self.page.expect_visible(&self.show_options).await
    }

    pub async fn expect_show_options_not_visible(&self) -> E2eResult<()> {
        self.page.expect_hidden(&self.show_options).await
    }

    pub async fn click_remove_friend(&self) -> E2eResult<()> {
        self.page.click(&self.remove_friend).await
    }

    pub async fn expect_remove_friend_visible(&self) -> E2eResult<()> {
        self.page.expect_visible(&self.remove_friend).await
    }

    pub async fn expect_remove_friend_not_visible(&self) -> E2eResult<()> {
        self.page.expect_hidden(&self.remove_friend).await
    }

    pub async fn expect_confirm_removal_modal_visible(&self) -> E2eResult<()> {
        self.page.expect_visible(&self.confirm_modal).await?;
        self.page
            .expect_text(&self.confirm_message, CONFIRM_REMOVAL_MESSAGE)
            .await
    }

    pub async fn expect_confirm_removal_modal_not_visible(&self) -> E2eResult<()> {
        self.page.expect_hidden(&self.confirm_modal).await
    }

    pub async fn confirm_removal(&self) -> E2eResult<()> {
        self.page.click(&self.confirm_yes).await
    }

    pub async fn cancel_removal(&self) -> E2eResult<()> {
        self.page.click(&self.confirm_cancel).await
    }

    pub async fn expect_friend_removal_alert_visible(&self) -> E2eResult<()> {
        self.page.expect_visible(&self.alert_container).await?;
        self.page
            .expect_contains_text(&self.alert_message, REMOVAL_ALERT_FRAGMENT)
            .await
    }

    /// Placeholder copy shown when the list has no entries
    pub async fn expect_empty_state(&self) -> E2eResult<()> {
        self.page
            .expect_visible(&Locator::text(EMPTY_STATE_TITLE))
            .await
            .map_err(|e| e.context("empty state title"))?;
        self.page
            .expect_visible(&Locator::text(EMPTY_STATE_HINT))
            .await
            .map_err(|e| e.context("empty state hint"))
    }
}
