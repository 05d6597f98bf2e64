//! Rocket.Chat MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server for Rocket.Chat integration.
//! Logs in once at startup, then serves tool calls over stdio.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use rocketchat_mcp_server::config::{Config, ConfigInput};
use rocketchat_mcp_server::error::{ConfigError, Result};
use rocketchat_mcp_server::mcp::server::McpServer;
use rocketchat_mcp_server::mcp::tools::ToolHandler;
use rocketchat_mcp_server::rocketchat::RocketChatClient;

/// Rocket.Chat MCP Server
#[derive(Parser)]
#[command(name = "rocketchat-mcp-server")]
#[command(author, version, about = "Rocket.Chat MCP Server - A Model Context Protocol server for Rocket.Chat")]
struct Cli {
    /// Rocket.Chat server URL, e.g. http://localhost:3000
    #[arg(long, env = "ROCKETCHAT_URL")]
    server_url: Option<String>,

    /// Rocket.Chat username
    #[arg(long, env = "ROCKETCHAT_USERNAME")]
    username: Option<String>,

    /// Rocket.Chat password
    #[arg(long, env = "ROCKETCHAT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// User ID of a personal access token (use with --auth-token instead of a password)
    #[arg(long, env = "ROCKETCHAT_USER_ID")]
    user_id: Option<String>,

    /// Personal access token
    #[arg(long, env = "ROCKETCHAT_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Timeout for each request to Rocket.Chat, in seconds
    #[arg(long, env = "ROCKETCHAT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Also append logs to this file
    #[arg(long, env = "ROCKETCHAT_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl From<Cli> for ConfigInput {
    fn from(cli: Cli) -> Self {
        Self {
            server_url: cli.server_url,
            username: cli.username,
            password: cli.password,
            user_id: cli.user_id,
            auth_token: cli.auth_token,
            timeout_secs: cli.timeout_secs,
            log_file: cli.log_file,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        tracing::error!("Startup failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries the MCP transport
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ConfigError::LogFile {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        tracing::info!("Logging initialized. Log file: {}", path.display());
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    tracing::info!("Starting Rocket.Chat MCP Server");

    let config = Config::new(ConfigInput::from(cli))?;
    tracing::info!(
        "Connecting to {} with {:?}",
        config.server_url,
        config.credentials
    );

    let client = RocketChatClient::connect(&config).await?;
    tracing::info!("Rocket.Chat client initialized successfully");

    let mut server = McpServer::new(ToolHandler::new(Arc::new(client)));
    tracing::info!("Starting MCP server with stdio transport");
    server.run_stdio().await?;

    Ok(())
}
