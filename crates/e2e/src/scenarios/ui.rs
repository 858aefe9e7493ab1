//! Friends UI against intercepted friends endpoints

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{navigate_to_friends, require};
use crate::error::E2eResult;
use crate::fixtures::Fixtures;
use crate::locator::Locator;
use crate::mocks::{
    mock_empty_friends_api, mock_friend_deletion_api, mock_friends_api, FriendsOverrides,
};
use crate::runner::{Outcome, Project, Scenario};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "friends-mocked-list",
            title: "[ui] Social Friends flow › Displays friends list with mocked data",
            project: Project::UiMocked,
            run: mocked_list,
        },
        Scenario {
            name: "friends-empty-state",
            title: "[ui] Social Friends flow › Displays empty state when no friends",
            project: Project::UiMocked,
            run: empty_state,
        },
        Scenario {
            name: "friends-remove",
            title: "[ui] Social Friends flow › Removes friend from friends list",
            project: Project::UiMocked,
            run: remove_friend,
        },
    ]
}

fn mocked_list(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        let data = mock_friends_api(fx.page(), FriendsOverrides::default()).await?;
        navigate_to_friends(&fx).await?;

        fx.friends().expect_friends_loaded().await?;
        let page = fx.page();
        page.expect_visible(&Locator::css(".users-list-item").first()).await?;
        page.expect_visible(&Locator::css(format!("text={}", data.display_username())))
            .await?;
        Ok(Outcome::Passed)
    }
    .boxed()
}

fn empty_state(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        // Installed last, so it wins over the passthrough rule for QueryFriends.
        mock_friends_api(fx.page(), FriendsOverrides::default()).await?;
        mock_empty_friends_api(fx.page()).await?;
        navigate_to_friends(&fx).await?;

        let friends = fx.friends();
        friends.expect_friends_loaded().await?;
        friends.expect_empty_state().await?;
        let count = friends.friends_count().await?;
        require(count == 0, format!("expected no friends listed, found {}", count))?;
        Ok(Outcome::Passed)
    }
    .boxed()
}

fn remove_friend(fx: Fixtures) -> BoxFuture<'static, E2eResult<Outcome>> {
    async move {
        mock_friends_api(fx.page(), FriendsOverrides::default()).await?;
        mock_friend_deletion_api(fx.page()).await?;
        navigate_to_friends(&fx).await?;

        let friends = fx.friends();
        friends.expect_friends_loaded().await?;
        fx.step("Remove friend and confirm", async {
            friends.click_show_options().await?;
            friends.click_remove_friend().await?;
            friends.expect_confirm_removal_modal_visible().await?;
            friends.confirm_removal().await
        })
        .await?;
        friends.expect_friend_removal_alert_visible().await?;
        Ok(Outcome::Passed)
    }
    .boxed()
}
