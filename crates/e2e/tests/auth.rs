//! Login, session detection and logout against the fake host

mod common;

use chessqa_e2e::auth::{self, AuthHelper, LogoutOutcome};
use chessqa_e2e::locator::Locator;
use chessqa_e2e::{E2eError, SessionState};
use common::{key, Effect, FakeHost};
use serde_json::json;

fn storage_state() -> serde_json::Value {
    json!({
        "cookies": [{
            "name": "CHESSCOM_REMEMBERME", "value": "token", "domain": ".chess.com", "path": "/",
            "expires": 4102444800.0, "httpOnly": true, "secure": true, "sameSite": "Lax"
        }],
        "origins": []
    })
}

#[tokio::test]
async fn login_persists_snapshot() {
    let host = FakeHost::start();
    host.browser()
        .on_click(&auth::login_button(), Effect::Navigate("/home".to_string()))
        .show(&auth::member_link())
        .storage_state = storage_state();
    let page = host.page().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("auth-state.json");

    AuthHelper::new(page)
        .login_and_save_state("alice", "s3cret", &output)
        .await
        .unwrap();

    let saved = SessionState::load(&output).unwrap();
    assert_eq!(saved.cookies[0].name, "CHESSCOM_REMEMBERME");

    let browser = host.browser();
    assert_eq!(browser.values[&key(&auth::username_field())], "alice");
    assert_eq!(browser.values[&key(&auth::password_field())], "s3cret");
    assert_eq!(host_first_goto(&browser.commands), "/login");
}

fn host_first_goto(commands: &[common::Recorded]) -> String {
    commands
        .iter()
        .find(|c| c.op == "goto")
        .map(|c| c.args["url"].as_str().unwrap().to_string())
        .unwrap()
}

#[tokio::test]
async fn missing_member_link_fails_without_writing() {
    let host = FakeHost::start();
    host.browser()
        .on_click(&auth::login_button(), Effect::Navigate("/home".to_string()))
        .storage_state = storage_state();
    let page = host.page().await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("auth-state.json");

    let err = AuthHelper::new(page)
        .login_and_save_state("alice", "wrong", &output)
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::AuthenticationTimeout { .. }), "{}", err);
    assert!(!output.exists());
    assert!(host.calls("storage_state").is_empty());
}

#[tokio::test]
async fn login_page_is_never_logged_in() {
    let host = FakeHost::start();
    host.browser().show(&auth::member_link());
    let page = host.page().await;
    page.goto("/login").await.unwrap();

    assert!(!AuthHelper::new(page).is_logged_in().await);
    // Decided from the URL alone.
    assert!(host.calls("is_visible").is_empty());
}

#[tokio::test]
async fn member_link_counts_as_logged_in() {
    let host = FakeHost::start();
    host.browser().show(&Locator::css(r#"a[href*="/member/"]"#));
    let page = host.page().await;
    page.goto("/home").await.unwrap();

    assert!(AuthHelper::new(page).is_logged_in().await);

    let probed: Vec<_> = host.calls("is_visible").iter().filter_map(|c| c.locator()).collect();
    assert_eq!(
        probed,
        vec![
            r#"locator('[data-testid="user-menu"]')"#.to_string(),
            r#"locator('a[href*="/member/"]')"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn broken_driver_reads_as_logged_out() {
    let host = FakeHost::start();
    host.browser().fail("url", "Error", "Target page has been closed");
    let page = host.page().await;

    assert!(!AuthHelper::new(page).is_logged_in().await);
}

#[tokio::test]
async fn logout_clicks_visible_control() {
    let host = FakeHost::start();
    let control = Locator::css("text=Log Out");
    host.browser()
        .show(&control)
        .on_click(&control, Effect::Navigate("/login".to_string()));
    let page = host.page().await;
    page.goto("/home").await.unwrap();

    let outcome = AuthHelper::new(page).logout().await.unwrap();

    assert_eq!(outcome, LogoutOutcome::Server);
    assert!(host.calls("clear_storage").is_empty());
    assert_eq!(host.browser().url, "https://www.chess.com/login");
}

#[tokio::test]
async fn logout_that_stays_signed_in_times_out() {
    let host = FakeHost::start();
    let control = Locator::css("text=Log Out");
    host.browser()
        .show(&control)
        .on_click(&control, Effect::Navigate("/home".to_string()));
    let page = host.page().await;
    page.goto("/member/chessTester1122").await.unwrap();

    let err = AuthHelper::new(page).logout().await.unwrap_err();

    assert!(matches!(err, E2eError::Timeout(_)), "{:?}", err);
    assert_eq!(host.calls("click").len(), 1);
    assert!(host.calls("clear_storage").is_empty());
}

#[tokio::test]
async fn logout_without_control_clears_storage() {
    let host = FakeHost::start();
    let page = host.page().await;
    page.goto("/home").await.unwrap();

    let outcome = AuthHelper::new(page).logout().await.unwrap();

    assert_eq!(outcome, LogoutOutcome::StorageCleared);
    assert_eq!(host.calls("clear_storage").len(), 1);
    assert!(host.calls("click").is_empty());
}

#[tokio::test]
async fn refused_login_stays_on_login_page() {
    let host = FakeHost::start();
    let page = host.page().await;
    page.goto(auth::LOGIN_PATH).await.unwrap();
    let helper = AuthHelper::new(page);

    helper.submit_credentials("invaliduser", "wrongpassword").await.unwrap();
    helper.expect_login_rejected().await.unwrap();

    let settles = host.calls("wait_for_load_state");
    assert_eq!(settles.len(), 1);
    assert_eq!(settles[0].args["state"], "networkidle");
}

#[tokio::test]
async fn refused_login_tolerates_busy_network() {
    let host = FakeHost::start();
    host.browser().fail("wait_for_load_state", "TimeoutError", "Timeout 5000ms exceeded.");
    let page = host.page().await;
    page.goto(auth::LOGIN_PATH).await.unwrap();

    AuthHelper::new(page).expect_login_rejected().await.unwrap();
}

#[tokio::test]
async fn accepted_login_is_not_a_rejection() {
    let host = FakeHost::start();
    host.browser().on_click(&auth::login_button(), Effect::Navigate("/home".to_string()));
    let page = host.page().await;
    page.goto(auth::LOGIN_PATH).await.unwrap();
    let helper = AuthHelper::new(page);

    helper.submit_credentials("invaliduser", "wrongpassword").await.unwrap();
    let err = helper.expect_login_rejected().await.unwrap_err();

    assert!(matches!(err, E2eError::AssertionFailed(ref m) if m.contains("/home")), "{}", err);
}

#[tokio::test]
async fn member_link_after_refused_login_fails() {
    let host = FakeHost::start();
    host.browser()
        .on_click(&auth::login_button(), Effect::Show(key(&auth::member_link())));
    let page = host.page().await;
    page.goto(auth::LOGIN_PATH).await.unwrap();
    let helper = AuthHelper::new(page);

    helper.submit_credentials("invaliduser", "wrongpassword").await.unwrap();
    let err = helper.expect_login_rejected().await.unwrap_err();

    assert!(
        matches!(err, E2eError::AssertionFailed(ref m) if m.contains("member link")),
        "{}",
        err
    );
}
