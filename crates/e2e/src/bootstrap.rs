//! One-off login that produces the session snapshot

use tracing::info;

use crate::auth::AuthHelper;
use crate::config::E2eConfig;
use crate::driver::{ContextOptions, Driver};
use crate::error::E2eResult;

/// Log in with the configured credentials and write the snapshot to
/// `config.storage_state`.
///
/// The browser is visible unless `headed` is false. On failure nothing is
/// written; an earlier snapshot, if any, is left as it was.
pub async fn setup_auth(config: &E2eConfig, headed: bool) -> E2eResult<()> {
    let mut config = config.clone();
    config.headless = !headed;

    info!("Setting up authentication state...");
    info!("Username: {}", config.username);
    info!("Storage state will be saved to: {}", config.storage_state.display());

    let driver = Driver::launch(&config).await?;
    let result = async {
        let page = driver.new_context(&ContextOptions::from_config(&config, false)).await?;
        AuthHelper::new(page)
            .login_and_save_state(&config.username, &config.password, &config.storage_state)
            .await
    }
    .await;
    driver.close().await;

    result?;
    info!("Authentication state setup complete");
    Ok(())
}
