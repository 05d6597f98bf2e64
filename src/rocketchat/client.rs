//! Rocket.Chat API client
//!
//! Thin REST client: one `reqwest` round trip per call, auth headers from the
//! session established at startup.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{api_url, Config, Credentials};
use crate::error::{ApiError, AuthError, ConfigError, NetworkError, RocketChatMcpError, Result};
use crate::rocketchat::types::*;

/// Header carrying the auth token
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Header carrying the user id
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Rocket.Chat API client
pub struct RocketChatClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// Server base URL without trailing slash
    server_url: String,

    /// Request timeout, reported in timeout errors
    timeout: Duration,

    /// Token pair attached to every request
    session: AuthSession,
}

impl RocketChatClient {
    /// Create a client around an existing session
    pub fn new(server_url: impl Into<String>, timeout: Duration, session: AuthSession) -> Result<Self> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            timeout,
            session,
        })
    }

    /// Authenticate with the configured credentials
    ///
    /// Password credentials go through `POST /api/v1/login`; a token pair is
    /// checked with `GET /api/v1/me`. Either way the returned client holds a
    /// session known to be valid at startup.
    pub async fn connect(config: &Config) -> Result<Self> {
        match &config.credentials {
            Credentials::Password { username, password } => {
                let http_client = build_http_client(config.timeout)?;
                let session = login(
                    &http_client,
                    &config.server_url,
                    config.timeout,
                    username,
                    password,
                )
                .await?;

                Ok(Self {
                    http_client,
                    server_url: config.server_url.clone(),
                    timeout: config.timeout,
                    session,
                })
            }
            Credentials::Token { user_id, auth_token } => {
                let client = Self::new(
                    config.server_url.clone(),
                    config.timeout,
                    AuthSession {
                        user_id: user_id.clone(),
                        auth_token: auth_token.clone(),
                    },
                )?;

                match client.me().await {
                    Ok(user) => {
                        tracing::info!(
                            "Auth token accepted for user: {}",
                            user.username.as_deref().unwrap_or(&user.id)
                        );
                        Ok(client)
                    }
                    Err(RocketChatMcpError::Api(ApiError::Status { status, .. }))
                        if status == 401 || status == 403 =>
                    {
                        Err(AuthError::TokenRejected { status }.into())
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Current session
    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Server base URL
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    // ==================== Raw Requests ====================

    /// Issue an authenticated GET and return the decoded body
    pub async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = api_url(&self.server_url, endpoint);
        tracing::debug!("GET {}", url);

        let request = self.http_client.get(&url).query(query);
        self.execute(endpoint, request).await
    }

    /// Issue an authenticated POST with a JSON body and return the decoded body
    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value> {
        let url = api_url(&self.server_url, endpoint);
        tracing::debug!("POST {}", url);

        let request = self.http_client.post(&url).json(body);
        self.execute(endpoint, request).await
    }

    async fn execute(&self, endpoint: &str, request: RequestBuilder) -> Result<Value> {
        let response = request
            .header(AUTH_TOKEN_HEADER, &self.session.auth_token)
            .header(USER_ID_HEADER, &self.session.user_id)
            .send()
            .await
            .map_err(|e| transport_error(e, endpoint, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, endpoint, self.timeout))?;

        if !status.is_success() {
            tracing::warn!("{} returned HTTP {}", endpoint, status.as_u16());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status, &text),
            }
            .into());
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        if body.get("success") == Some(&Value::Bool(false)) {
            let message = extract_message(&body).unwrap_or_else(|| "Unknown error".to_string());
            tracing::warn!("{} reported failure: {}", endpoint, message);
            return Err(ApiError::Rejected { message }.into());
        }

        Ok(body)
    }

    // ==================== User Operations ====================

    /// The authenticated user
    pub async fn me(&self) -> Result<User> {
        let body = self.get("me", &[]).await?;
        decode("me", body)
    }

    /// List users visible to the caller
    pub async fn list_users(&self) -> Result<ApiResponse<Vec<User>>> {
        let body = self.get("users.list", &[]).await?;
        decode_response("users.list", body, |list: UserList| list.users)
    }

    /// Look up a user by username
    pub async fn user_info(&self, username: &str) -> Result<ApiResponse<User>> {
        let body = self
            .get("users.info", &[("username", username.to_string())])
            .await?;
        decode_response("users.info", body, |info: UserInfo| info.user)
    }

    // ==================== Message Operations ====================

    /// Post a message to a channel (name, `#name` or room id)
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
    ) -> Result<ApiResponse<PostMessageResponse>> {
        let body = self
            .post("chat.postMessage", &PostMessageRequest { channel, text })
            .await?;
        decode_response("chat.postMessage", body, |sent: PostMessageResponse| sent)
    }

    /// Most recent messages of a public channel
    pub async fn channel_messages(
        &self,
        room_id: &str,
        count: u32,
    ) -> Result<ApiResponse<Vec<ChatMessage>>> {
        let body = self
            .get(
                "channels.messages",
                &[("roomId", room_id.to_string()), ("count", count.to_string())],
            )
            .await?;
        decode_response("channels.messages", body, |list: MessageList| list.messages)
    }

    // ==================== Room Operations ====================

    /// Public channels
    pub async fn list_channels(&self) -> Result<ApiResponse<Vec<Room>>> {
        let body = self.get("channels.list", &[]).await?;
        decode_response("channels.list", body, |list: ChannelList| list.channels)
    }

    /// Private groups the caller belongs to
    pub async fn list_groups(&self) -> Result<ApiResponse<Vec<Room>>> {
        let body = self.get("groups.list", &[]).await?;
        decode_response("groups.list", body, |list: GroupList| list.groups)
    }

    /// Create a public channel
    pub async fn create_channel(&self, name: &str) -> Result<ApiResponse<Room>> {
        let body = self
            .post("channels.create", &CreateChannelRequest { name })
            .await?;
        decode_response("channels.create", body, |created: CreateChannelResponse| {
            created.channel
        })
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            ConfigError::HttpClient {
                message: e.to_string(),
            }
            .into()
        })
}

/// Exchange username/password for a token pair
async fn login(
    http_client: &reqwest::Client,
    server_url: &str,
    timeout: Duration,
    username: &str,
    password: &str,
) -> Result<AuthSession> {
    let url = api_url(server_url, "login");
    tracing::info!("Attempting login for user: {}", username);

    let response = http_client
        .post(&url)
        .json(&LoginRequest {
            user: username,
            password,
        })
        .send()
        .await
        .map_err(|e| transport_error(e, "login", timeout))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(e, "login", timeout))?;

    if !status.is_success() {
        tracing::error!("Login failed with HTTP {} (url={})", status.as_u16(), url);
        return Err(AuthError::LoginRejected {
            username: username.to_string(),
            status: Some(status.as_u16()),
            message: error_message(status, &text),
        }
        .into());
    }

    let body: LoginResponse = serde_json::from_str(&text).map_err(|_| {
        AuthError::MalformedLoginResponse {
            field: "a JSON body".to_string(),
        }
    })?;

    if body.status.as_deref() != Some("success") {
        let message = body
            .message
            .or(body.error)
            .unwrap_or_else(|| "login status was not 'success'".to_string());
        tracing::error!("Login failed: {} (url={})", message, url);
        return Err(AuthError::LoginRejected {
            username: username.to_string(),
            status: None,
            message,
        }
        .into());
    }

    let data = body.data.ok_or_else(|| AuthError::MalformedLoginResponse {
        field: "data".to_string(),
    })?;
    let auth_token = data.auth_token.ok_or_else(|| AuthError::MalformedLoginResponse {
        field: "data.authToken".to_string(),
    })?;
    let user_id = data.user_id.ok_or_else(|| AuthError::MalformedLoginResponse {
        field: "data.userId".to_string(),
    })?;

    tracing::info!("Login successful for user: {}, user_id: {}", username, user_id);
    Ok(AuthSession { user_id, auth_token })
}

fn transport_error(err: reqwest::Error, endpoint: &str, timeout: Duration) -> RocketChatMcpError {
    if err.is_timeout() {
        tracing::error!("{} timed out after {:?}", endpoint, timeout);
        NetworkError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_secs: timeout.as_secs(),
        }
        .into()
    } else {
        tracing::error!("{} request error: {}", endpoint, err);
        err.into()
    }
}

/// Best human-readable message from an error body
fn error_message(status: StatusCode, text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|body| extract_message(&body))
        .or_else(|| {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

fn extract_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Typed view of a body that keeps the body itself for pass-through
fn decode_response<W: DeserializeOwned, T>(
    endpoint: &str,
    body: Value,
    extract: impl FnOnce(W) -> T,
) -> Result<ApiResponse<T>> {
    let wrapper: W = decode(endpoint, body.clone())?;
    Ok(ApiResponse {
        data: extract(wrapper),
        body,
    })
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| {
        ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
