//! axe scans of the main navigation surfaces

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{CHESS_URL, FRIENDS_URL, PLAY_COMPUTER_URL};
use crate::a11y;
use crate::error::E2eResult;
use crate::fixtures::Fixtures;
use crate::page::LoadState;
use crate::runner::{Outcome, Project, Scenario};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "a11y-home",
            title: "[a11y] Navigation Accessibility › Home page accessibility scan",
            project: Project::A11yLive,
            run: home,
        },
        Scenario {
            name: "a11y-play-menu",
            title: "[a11y] Navigation Accessibility › Play menu accessibility scan",
            project: Project::A11yLive,
            run: play_menu,
        },
        Scenario {
            name: "a11y-social-menu",
            title: "[a11y] Navigation Accessibility › Social menu accessibility scan",
            project: Project::A11yLive,
            run: social_menu,
        },
        Scenario {
            name: "a11y-friends",
            title: "[a11y] Navigation Accessibility › Friends page accessibility scan",
            project: Project::A11yLive,
            run: friends,
        },
        Scenario {
            name: "a11y-bots",
            title: "[a11y] Navigation Accessibility › Bots page accessibility scan",
            project: Project::A11yLive,
            run: bots,
        },
    ]
}

async fn scan(fx: &Fixtures) -> E2eResult<Outcome> {
    fx.step("Perform accessibility scan", a11y::expect_no_violations(fx.page()))
        .await?;
    Ok(Outcome::Passed)
}

fn home(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        fx.step("Navigate to home page", async {
            fx.home().goto().await?;
            fx.page().expect_url(&CHESS_URL).await
        })
        .await?;
        scan(&fx).await
    }
    .boxed()
}

fn play_menu(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        fx.step("Navigate to home page", async {
            fx.home().goto().await?;
            fx.page().expect_url(&CHESS_URL).await
        })
        .await?;
        fx.step("Open Play menu", async {
            fx.home().open_play_menu().await?;
            fx.page().wait_for_load_state(LoadState::NetworkIdle).await
        })
        .await?;
        scan(&fx).await
    }
    .boxed()
}

fn social_menu(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        fx.step("Navigate to home page", async {
            fx.social().goto().await?;
            fx.page().expect_url(&CHESS_URL).await
        })
        .await?;
        fx.step("Open Social menu", async {
            fx.social().open_social_menu().await?;
            fx.page().wait_for_load_state(LoadState::NetworkIdle).await
        })
        .await?;
        scan(&fx).await
    }
    .boxed()
}

fn friends(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        fx.step("Navigate to home page", async {
            fx.social().goto().await?;
            fx.page().expect_url(&CHESS_URL).await
        })
        .await?;
        fx.step("Navigate to Social > Friends", async {
            fx.social().open_social_menu().await?;
            fx.social().go_to_friends().await?;
            fx.page().expect_url(&FRIENDS_URL).await
        })
        .await?;
        scan(&fx).await
    }
    .boxed()
}

fn bots(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        fx.step("Navigate to home page", async {
            fx.home().goto().await?;
            fx.page().expect_url(&CHESS_URL).await
        })
        .await?;
        fx.step("Navigate to Play > Bots", async {
            fx.home().go_to_play_bots().await?;
            fx.page().expect_url(&PLAY_COMPUTER_URL).await
        })
        .await?;
        scan(&fx).await
    }
    .boxed()
}
