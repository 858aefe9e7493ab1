//! Login, session detection and logout

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{LoadState, Page};
use crate::probe::ProbeList;

pub const LOGIN_PATH: &str = "/login";

const REDIRECT_TIMEOUT: Duration = Duration::from_secs(10);
const MEMBER_LINK_TIMEOUT: Duration = Duration::from_secs(5);
const LOGOUT_REDIRECT_TIMEOUT: Duration = Duration::from_secs(5);
const REJECTION_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);
const MEMBER_LINK_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Which logout path ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// A logout control was clicked and the site redirected
    Server,
    /// No control was found; client storage was wiped instead
    StorageCleared,
}

pub fn is_login_url(url: &str) -> bool {
    url.contains(LOGIN_PATH)
}

/// Where a server-side logout may land: the site root or a login page
pub fn is_logged_out_landing(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path() == "/" || parsed.path().starts_with(LOGIN_PATH),
        Err(_) => false,
    }
}

/// Link to the signed-in member's profile; present on every page once logged in
pub fn member_link() -> Locator {
    Locator::css(r#"a[href*="/member/"]"#).first()
}

pub fn username_field() -> Locator {
    Locator::role_named("textbox", "Username, Phone, or Email")
}

pub fn password_field() -> Locator {
    Locator::role_named("textbox", "Password")
}

pub fn login_button() -> Locator {
    Locator::role_named("button", "Log In")
}

fn logged_in_indicators() -> ProbeList {
    ProbeList::new([
        Locator::css(r#"[data-testid="user-menu"]"#),
        Locator::css(r#"a[href*="/member/"]"#),
        Locator::css("text=Log Out"),
        Locator::css("text=Sign Out"),
    ])
}

fn logout_triggers() -> ProbeList {
    ProbeList::new([
        Locator::css("text=Log Out"),
        Locator::css("text=Sign Out"),
        Locator::css(r#"[data-testid="logout"]"#),
        Locator::css(r#"a[href*="/logout"]"#),
    ])
}

pub struct AuthHelper {
    page: Page,
}

impl AuthHelper {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Fill the login form and press "Log In" without waiting for the outcome
    pub async fn submit_credentials(&self, username: &str, password: &str) -> E2eResult<()> {
        self.page.fill(&username_field(), username).await?;
        self.page.fill(&password_field(), password).await?;
        self.page.click(&login_button()).await
    }

    /// After a refused sign-in, let the page settle and check that the browser
    /// is still on the login page with no member link.
    pub async fn expect_login_rejected(&self) -> E2eResult<()> {
        match self
            .page
            .wait_for_load_state_within(LoadState::NetworkIdle, REJECTION_SETTLE_TIMEOUT)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_timeout() => debug!("Network still busy after refused login: {}", e),
            Err(e) => return Err(e),
        }

        let url = self.page.url().await?;
        if !is_login_url(&url) {
            return Err(E2eError::AssertionFailed(format!(
                "expected to stay on {} after a refused login but landed on {}",
                LOGIN_PATH, url
            )));
        }
        if self.page.is_visible(&member_link(), MEMBER_LINK_CHECK_TIMEOUT).await {
            return Err(E2eError::AssertionFailed(
                "member link visible after a refused login".to_string(),
            ));
        }
        Ok(())
    }

    /// Log in through the form and persist the resulting session to `output`.
    ///
    /// Fails with [`E2eError::AuthenticationTimeout`] when the redirect or the
    /// member link does not appear in time; bad credentials and a broken
    /// environment look the same from here.
    pub async fn login_and_save_state(
        &self,
        username: &str,
        password: &str,
        output: &Path,
    ) -> E2eResult<()> {
        self.page.goto(LOGIN_PATH).await?;
        self.submit_credentials(username, password).await?;

        self.page
            .wait_for_url("away from /login", REDIRECT_TIMEOUT, |url| !is_login_url(url))
            .await
            .map_err(|e| match e {
                E2eError::Timeout(_) => E2eError::AuthenticationTimeout {
                    signal: format!(
                        "still on {} after {} s",
                        LOGIN_PATH,
                        REDIRECT_TIMEOUT.as_secs()
                    ),
                },
                other => other,
            })?;

        self.page
            .expect_visible_within(&member_link(), MEMBER_LINK_TIMEOUT)
            .await
            .map_err(|e| match e {
                E2eError::AssertionFailed(_) => E2eError::AuthenticationTimeout {
                    signal: format!(
                        "member link not visible after {} s",
                        MEMBER_LINK_TIMEOUT.as_secs()
                    ),
                },
                other => other,
            })?;

        let state = self.page.storage_state().await?;
        state.save(output)?;
        info!("Authenticated as {}", username);
        Ok(())
    }

    /// Probe for a signed-in session. Never fails.
    pub async fn is_logged_in(&self) -> bool {
        let url = match self.page.url().await {
            Ok(url) => url,
            Err(e) => {
                debug!("is_logged_in: could not read URL: {}", e);
                return false;
            }
        };
        if is_login_url(&url) {
            return false;
        }
        logged_in_indicators().first_visible(&self.page).await.is_some()
    }

    /// Log out through the first visible control, or wipe client storage
    pub async fn logout(&self) -> E2eResult<LogoutOutcome> {
        let triggers = logout_triggers();
        if let Some(trigger) = triggers.first_visible(&self.page).await {
            self.page.click(trigger).await?;
            self.page
                .wait_for_url(
                    "on /login or the site root",
                    LOGOUT_REDIRECT_TIMEOUT,
                    is_logged_out_landing,
                )
                .await?;
            return Ok(LogoutOutcome::Server);
        }

        debug!("No logout control visible; clearing client storage");
        self.page.clear_storage().await?;
        Ok(LogoutOutcome::StorageCleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_detection() {
        assert!(is_login_url("https://www.chess.com/login"));
        assert!(is_login_url("https://www.chess.com/login_and_go?returnUrl=/home"));
        assert!(!is_login_url("https://www.chess.com/home"));
    }

    #[test]
    fn logout_lands_on_root_or_login_only() {
        assert!(is_logged_out_landing("https://www.chess.com/"));
        assert!(is_logged_out_landing("https://www.chess.com"));
        assert!(is_logged_out_landing("https://www.chess.com/login?returnUrl=%2Fhome"));
        assert!(!is_logged_out_landing("https://www.chess.com/home"));
        assert!(!is_logged_out_landing("https://www.chess.com/member/chessTester1122"));
        assert!(!is_logged_out_landing("not a url"));
    }

    #[test]
    fn probe_orders_are_fixed() {
        let indicators: Vec<String> =
            logged_in_indicators().candidates().iter().map(ToString::to_string).collect();
        assert_eq!(
            indicators,
            vec![
                r#"locator('[data-testid="user-menu"]')"#,
                r#"locator('a[href*="/member/"]')"#,
                "locator('text=Log Out')",
                "locator('text=Sign Out')",
            ]
        );
        assert_eq!(logout_triggers().candidates().len(), 4);
    }
}
