//! Live flows: login, bots and friend search

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

use super::{navigate_to_friends, require, CHESS_URL, FRIENDS_URL, LOGIN_URL};
use crate::auth::{self, is_login_url, LOGIN_PATH};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::Fixtures;
use crate::pages::BotLock;
use crate::runner::{Outcome, Project, Scenario};

const LOGIN_REDIRECT_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_TERM: &str = "MagnusCarlsen";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "login-valid",
            title: "[e2e] User Login flow › User can successfully log in with valid credentials",
            project: Project::E2eLive,
            run: login_valid,
        },
        Scenario {
            name: "login-invalid",
            title: "[e2e] User Login flow › User cannot log in with invalid credentials",
            project: Project::E2eLive,
            run: login_invalid,
        },
        Scenario {
            name: "bot-chat",
            title: concat!(
                "[e2e] Bot chat flow › ",
                "Chat starts after selecting a beginner bot and pressing Play"
            ),
            project: Project::E2eLive,
            run: bot_chat,
        },
        Scenario {
            name: "bot-locked-modal",
            title: "[e2e] Locked Bot Modal › Modal appears when selecting a locked bot",
            project: Project::E2eLive,
            run: locked_bot_modal,
        },
        Scenario {
            name: "friends-search",
            title: "[e2e] Social Friends Search flow › Searches for friends by username",
            project: Project::E2eLive,
            run: friends_search,
        },
    ]
}

/// Drop the loaded session so the login form is reachable
async fn sign_out_client(fx: &Fixtures) -> E2eResult<()> {
    let page = fx.page();
    page.clear_cookies().await?;
    // Storage is per origin; load one first.
    page.goto("/").await?;
    page.clear_storage().await
}

fn login_valid(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        sign_out_client(&fx).await?;
        let page = fx.page();
        page.goto(LOGIN_PATH).await?;
        page.expect_url(&LOGIN_URL).await?;

        let config = fx.config();
        fx.auth().submit_credentials(&config.username, &config.password).await?;

        page.wait_for_url("away from /login", LOGIN_REDIRECT_TIMEOUT, |url| !is_login_url(url))
            .await?;
        page.expect_url(&CHESS_URL).await?;
        page.expect_visible(&auth::member_link()).await?;

        fx.step("Session persists in authenticated areas", async {
            page.goto("/friends").await?;
            page.expect_url(&FRIENDS_URL).await?;
            page.expect_url_not(&LOGIN_URL).await
        })
        .await?;
        Ok(Outcome::Passed)
    }
    .boxed()
}

fn login_invalid(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        sign_out_client(&fx).await?;
        let page = fx.page();
        page.goto(LOGIN_PATH).await?;
        page.expect_url(&LOGIN_URL).await?;

        fx.auth().submit_credentials("invaliduser", "wrongpassword").await?;
        fx.auth().expect_login_rejected().await?;
        Ok(Outcome::Passed)
    }
    .boxed()
}

async fn open_bots(fx: &Fixtures) -> E2eResult<()> {
    fx.home().goto().await?;
    fx.home().go_to_play_bots().await?;
    fx.bots().handle_modals().await
}

fn bot_chat(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        open_bots(&fx).await?;

        let bot = fx
            .step("Choose a beginner bot", fx.bots().select_bot(BotLock::Unlocked))
            .await?;
        fx.step("Start game", fx.bots().start_game()).await?;

        fx.step("Verify chat with selected bot is visible", async {
            let game = fx.game();
            game.expect_chat_visible_for_bot(&bot).await?;
            let message = game.bot_message().await?;
            require(!message.trim().is_empty(), "bot message is empty")?;
            game.expect_game_started().await
        })
        .await?;
        Ok(Outcome::Passed)
    }
    .boxed()
}

fn locked_bot_modal(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        open_bots(&fx).await?;

        match fx
            .step("Choose a locked beginner bot", fx.bots().select_bot(BotLock::Locked))
            .await
        {
            Ok(bot) => info!("Selected locked bot: {}", bot),
            Err(E2eError::NoSuchBot { .. }) => {
                return Ok(Outcome::Skipped(
                    "No locked bots available for this account".to_string(),
                ))
            }
            Err(e) => return Err(e),
        }

        fx.step("Verify locked bot modal is displayed", fx.bots().expect_locked_bot_modal())
            .await?;
        Ok(Outcome::Passed)
    }
    .boxed()
}

fn friends_search(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        navigate_to_friends(&fx).await?;

        let friends = fx.friends();
        let page = fx.page();
        friends.expect_friends_loaded().await?;
        friends.expect_search_input_visible().await?;

        fx.step("Search for a friend", async {
            friends.search_for_friend(SEARCH_TERM).await?;
            page.expect_value(friends.search_input(), SEARCH_TERM).await?;
            friends.expect_search_results_visible(SEARCH_TERM).await
        })
        .await?;

        fx.step("Clear search", async {
            friends.clear_search().await?;
            page.expect_value(friends.search_input(), "").await
        })
        .await?;
        Ok(Outcome::Passed)
    }
    .boxed()
}
