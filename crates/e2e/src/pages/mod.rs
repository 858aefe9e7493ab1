//! Page objects, one per screen of the site

pub mod bots;
pub mod friends;
pub mod game;
pub mod home;
pub mod modals;
pub mod social;

pub use bots::{BotFlowState, BotLock, BotsPage};
pub use friends::FriendsPage;
pub use game::GamePage;
pub use home::HomePage;
pub use modals::ModalFlag;
pub use social::SocialPage;
