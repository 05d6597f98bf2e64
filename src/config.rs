//! Configuration management for the Rocket.Chat MCP Server
//!
//! Turns raw CLI/environment values into a validated [`Config`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// How the server authenticates against Rocket.Chat
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Log in with `POST /api/v1/login`
    Password { username: String, password: String },

    /// Reuse a token pair issued earlier (personal access token)
    Token { user_id: String, auth_token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Token { user_id, .. } => f
                .debug_struct("Token")
                .field("user_id", user_id)
                .field("auth_token", &"<redacted>")
                .finish(),
        }
    }
}

/// Raw startup values, as supplied on the command line or via environment
#[derive(Default, Clone)]
pub struct ConfigInput {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_id: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Configuration for the Rocket.Chat MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Server base URL without trailing slash
    pub server_url: String,

    /// Authentication method
    pub credentials: Credentials,

    /// Timeout applied to every outbound HTTP request
    pub timeout: Duration,

    /// Optional file receiving a copy of the logs
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Validate raw input into a configuration
    pub fn new(input: ConfigInput) -> Result<Self> {
        let server_url = normalize_server_url(non_empty(input.server_url).ok_or_else(|| {
            ConfigError::MissingArgument {
                name: "--server-url".to_string(),
            }
        })?)?;

        let credentials = match (non_empty(input.user_id), non_empty(input.auth_token)) {
            (Some(user_id), Some(auth_token)) => Credentials::Token { user_id, auth_token },
            (Some(_), None) | (None, Some(_)) => return Err(ConfigError::IncompleteToken.into()),
            (None, None) => {
                let username =
                    non_empty(input.username).ok_or_else(|| ConfigError::MissingArgument {
                        name: "--username".to_string(),
                    })?;
                let password =
                    non_empty(input.password).ok_or_else(|| ConfigError::MissingArgument {
                        name: "--password".to_string(),
                    })?;
                Credentials::Password { username, password }
            }
        };

        let timeout_secs = input.timeout_secs.unwrap_or(rocketchat::DEFAULT_TIMEOUT_SECS);
        if !(rocketchat::MIN_TIMEOUT_SECS..=rocketchat::MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::TimeoutOutOfRange {
                value: timeout_secs,
                min: rocketchat::MIN_TIMEOUT_SECS,
                max: rocketchat::MAX_TIMEOUT_SECS,
            }
            .into());
        }

        Ok(Self {
            server_url,
            credentials,
            timeout: Duration::from_secs(timeout_secs),
            log_file: input.log_file,
        })
    }

    /// Full URL of a REST endpoint, e.g. `chat.postMessage`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        api_url(&self.server_url, endpoint)
    }
}

/// Build `<server>/api/v1/<endpoint>`
pub fn api_url(server_url: &str, endpoint: &str) -> String {
    format!(
        "{}{}/{}",
        server_url,
        rocketchat::API_PREFIX,
        endpoint.trim_start_matches('/')
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn normalize_server_url(raw: String) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();

    let parsed = reqwest::Url::parse(&trimmed).map_err(|e| ConfigError::InvalidServerUrl {
        url: raw.clone(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed),
        other => Err(ConfigError::InvalidServerUrl {
            url: raw,
            message: format!("unsupported scheme '{}'", other),
        }
        .into()),
    }
}

/// Rocket.Chat API constants
pub mod rocketchat {
    /// REST API prefix
    pub const API_PREFIX: &str = "/api/v1";

    /// Default outbound request timeout
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const MIN_TIMEOUT_SECS: u64 = 1;
    pub const MAX_TIMEOUT_SECS: u64 = 300;

    /// Messages fetched by `get_channel_messages` when no count is given
    pub const DEFAULT_MESSAGE_COUNT: u32 = 20;

    /// Upper bound on messages fetched in one call
    pub const MAX_MESSAGE_COUNT: u32 = 100;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RocketChatMcpError;

    fn password_input() -> ConfigInput {
        ConfigInput {
            server_url: Some("http://localhost:3000/".to_string()),
            username: Some("alice".to_string()),
            password: Some("s3cret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_password_config() {
        let config = Config::new(password_input()).unwrap();
        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(matches!(config.credentials, Credentials::Password { .. }));
        assert_eq!(
            config.endpoint_url("chat.postMessage"),
            "http://localhost:3000/api/v1/chat.postMessage"
        );
    }

    #[test]
    fn test_token_pair_wins() {
        let config = Config::new(ConfigInput {
            user_id: Some("uid".to_string()),
            auth_token: Some("tok".to_string()),
            ..password_input()
        })
        .unwrap();
        assert_eq!(
            config.credentials,
            Credentials::Token {
                user_id: "uid".to_string(),
                auth_token: "tok".to_string()
            }
        );
    }

    #[test]
    fn test_half_token_pair_rejected() {
        let err = Config::new(ConfigInput {
            user_id: Some("uid".to_string()),
            ..password_input()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            RocketChatMcpError::Config(ConfigError::IncompleteToken)
        ));
    }

    #[test]
    fn test_missing_arguments() {
        let err = Config::new(ConfigInput {
            server_url: None,
            ..password_input()
        })
        .unwrap_err();
        assert!(err.to_string().contains("--server-url"));

        let err = Config::new(ConfigInput {
            password: Some("   ".to_string()),
            ..password_input()
        })
        .unwrap_err();
        assert!(err.to_string().contains("--password"));
    }

    #[test]
    fn test_invalid_server_url() {
        for url in ["not a url", "ftp://chat.example.com"] {
            let err = Config::new(ConfigInput {
                server_url: Some(url.to_string()),
                ..password_input()
            })
            .unwrap_err();
            assert!(matches!(
                err,
                RocketChatMcpError::Config(ConfigError::InvalidServerUrl { .. })
            ));
        }
    }

    #[test]
    fn test_timeout_range() {
        let err = Config::new(ConfigInput {
            timeout_secs: Some(0),
            ..password_input()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            RocketChatMcpError::Config(ConfigError::TimeoutOutOfRange { value: 0, .. })
        ));

        let config = Config::new(ConfigInput {
            timeout_secs: Some(10),
            ..password_input()
        })
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::new(password_input()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }
}
