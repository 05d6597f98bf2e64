//! Error types for the Rocket.Chat MCP Server
//!
//! Startup errors (configuration, authentication) are fatal. Everything that
//! can go wrong during a tool call is turned into an error result instead.

use thiserror::Error;

/// Main error type for the Rocket.Chat MCP Server
#[derive(Error, Debug)]
pub enum RocketChatMcpError {
    /// Invalid or missing startup configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Login or token verification failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Rocket.Chat could not be reached
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Rocket.Chat answered with an error
    #[error("Rocket.Chat API error: {0}")]
    Api(#[from] ApiError),

    /// Malformed tool arguments
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RocketChatMcpError {
    /// Stable tag used in structured tool results
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Auth(_) => "authentication",
            Self::Network(_) => "network",
            Self::Api(_) => "api",
            Self::Validation(_) => "validation",
            Self::Mcp(_) => "protocol",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// HTTP status returned by Rocket.Chat, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(ApiError::Status { status, .. }) => Some(*status),
            Self::Auth(AuthError::LoginRejected { status, .. }) => *status,
            Self::Auth(AuthError::TokenRejected { status }) => Some(*status),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("Invalid server URL '{url}': {message}")]
    InvalidServerUrl { url: String, message: String },

    #[error("Incomplete token credentials: both --user-id and --auth-token are required")]
    IncompleteToken,

    #[error("Timeout must be between {min} and {max} seconds, got {value}")]
    TimeoutOutOfRange { value: u64, min: u64, max: u64 },

    #[error("Failed to open log file {path}: {message}")]
    LogFile { path: String, message: String },

    #[error("Failed to build HTTP client: {message}")]
    HttpClient { message: String },
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Login rejected for user '{username}': {message}")]
    LoginRejected {
        username: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Login response is missing {field}")]
    MalformedLoginResponse { field: String },

    #[error("Auth token rejected by server (HTTP {status})")]
    TokenRejected { status: u16 },
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Request to {endpoint} timed out after {timeout_secs} seconds")]
    Timeout { endpoint: String, timeout_secs: u64 },

    #[error("Server unreachable: {message}")]
    Unreachable { message: String },

    #[error("Request failed: {message}")]
    Request { message: String },
}

/// Errors reported by the Rocket.Chat API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Unexpected response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool parameters: {message}")]
    InvalidParams { message: String },
}

/// Result type alias for Rocket.Chat MCP operations
pub type Result<T> = std::result::Result<T, RocketChatMcpError>;

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            NetworkError::Unreachable {
                message: err.to_string(),
            }
        } else {
            NetworkError::Request {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for RocketChatMcpError {
    fn from(err: reqwest::Error) -> Self {
        RocketChatMcpError::Network(NetworkError::from(err))
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(name, _)| *name);

        match fields.first() {
            Some((name, errs)) => {
                let message = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                ValidationError::InvalidParameter {
                    name: name.to_string(),
                    message,
                }
            }
            None => ValidationError::InvalidArguments {
                message: errors.to_string(),
            },
        }
    }
}

impl From<validator::ValidationErrors> for RocketChatMcpError {
    fn from(errors: validator::ValidationErrors) -> Self {
        RocketChatMcpError::Validation(ValidationError::from(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 401,
            message: "You must be logged in to do this.".to_string(),
        };
        let text = RocketChatMcpError::from(err).to_string();
        assert!(text.contains("401"));
        assert!(text.contains("logged in"));
    }

    #[test]
    fn test_error_conversion() {
        let err: RocketChatMcpError = ConfigError::IncompleteToken.into();
        assert!(matches!(err, RocketChatMcpError::Config(_)));
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_status_only_for_http_errors() {
        let api: RocketChatMcpError = ApiError::Status {
            status: 403,
            message: "forbidden".to_string(),
        }
        .into();
        assert_eq!(api.status(), Some(403));

        let rejected: RocketChatMcpError = ApiError::Rejected {
            message: "error-room-not-found".to_string(),
        }
        .into();
        assert_eq!(rejected.status(), None);

        let timeout: RocketChatMcpError = NetworkError::Timeout {
            endpoint: "users.list".to_string(),
            timeout_secs: 30,
        }
        .into();
        assert_eq!(timeout.status(), None);
        assert_eq!(timeout.kind(), "network");
    }

    #[test]
    fn test_login_rejected_hides_password() {
        let err = AuthError::LoginRejected {
            username: "alice".to_string(),
            status: Some(401),
            message: "Unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Login rejected for user 'alice': Unauthorized"
        );
    }
}
