//! Rocket.Chat MCP Server Library
//!
//! A Model Context Protocol (MCP) server for Rocket.Chat integration.
//! Exposes Rocket.Chat REST operations (messages, channels, users) as MCP tools.

pub mod config;
pub mod error;
pub mod mcp;
pub mod rocketchat;

pub use config::Config;
pub use error::{Result, RocketChatMcpError};
