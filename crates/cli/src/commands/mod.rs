//! CLI command implementations

pub mod list;
pub mod setup_auth;
