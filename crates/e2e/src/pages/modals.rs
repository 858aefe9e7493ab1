//! Interstitial suppression
//!
//! The site shows intro modals unless a flag in localStorage says they were
//! already dismissed. Writing the flag before the triggering interaction
//! keeps the modal from ever opening.

use tracing::debug;

use crate::error::E2eResult;
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalFlag {
    /// "Play vs computer" intro shown on the bots page
    PlayVsComputerIntro,
    /// Intro shown the first time the social area opens
    SocialIntro,
}

impl ModalFlag {
    pub fn storage_key(&self) -> &'static str {
        match self {
            ModalFlag::PlayVsComputerIntro => "play_vs_computer_intro_modal_dismissed",
            ModalFlag::SocialIntro => "social_intro_modal_dismissed",
        }
    }
}

/// Mark `flags` as dismissed for the current origin
pub async fn dismiss(page: &Page, flags: &[ModalFlag]) -> E2eResult<()> {
    let entries: Vec<(&str, &str)> = flags.iter().map(|f| (f.storage_key(), "true")).collect();
    debug!("Pre-dismissing modals: {:?}", flags);
    page.set_local_storage(&entries).await
}
