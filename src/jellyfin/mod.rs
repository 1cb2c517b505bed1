//! Jellyfin API client module for interacting with Jellyfin media server

pub mod api;
mod auth;
pub mod models;
pub mod models_playback;
#[cfg(test)]
mod tests;

pub use api::*;
pub use auth::authorization_header_value;
pub use models::*;
pub use models_playback::*;
