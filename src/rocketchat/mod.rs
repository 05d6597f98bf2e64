//! Rocket.Chat API module
//!
//! Contains the REST client, the authenticated session, and the payload types.

pub mod client;
pub mod types;

pub use client::RocketChatClient;
pub use types::AuthSession;
