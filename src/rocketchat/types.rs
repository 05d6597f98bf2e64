//! Rocket.Chat REST API type definitions
//!
//! These types mirror the Rocket.Chat API responses and are used for serialization/deserialization.
//! Fields the server may omit are optional or defaulted.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/v1/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub user: &'a str,
    pub password: &'a str,
}

/// Response of `POST /api/v1/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// `"success"` or `"error"`
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub data: Option<LoginData>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Token pair inside a login response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default)]
    pub user_id: Option<String>,
}

/// Authenticated session attached to every request
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: String,
    pub auth_token: String,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user_id", &self.user_id)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// A user email address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub address: String,

    #[serde(default)]
    pub verified: bool,
}

/// A Rocket.Chat user
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    /// User ID
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<Email>,

    /// Presence (`online`, `away`, `busy`, `offline`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl User {
    /// First email address, if any
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(|e| e.address.as_str())
    }
}

/// A channel (`t = "c"`) or private group (`t = "p"`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Room {
    /// Room ID
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Friendly name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fname: Option<String>,

    /// Room type
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
}

/// Author of a message
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageAuthor {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Message timestamp: REST returns ISO strings, some endpoints extended JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageTimestamp {
    Iso(String),
    Extended {
        #[serde(rename = "$date")]
        date: Value,
    },
}

impl fmt::Display for MessageTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTimestamp::Iso(s) => write!(f, "{}", s),
            MessageTimestamp::Extended { date: Value::String(s) } => write!(f, "{}", s),
            MessageTimestamp::Extended { date } => write!(f, "{}", date),
        }
    }
}

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatMessage {
    /// Message ID
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Room ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,

    /// Message text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<MessageTimestamp>,

    /// Author
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<MessageAuthor>,
}

/// Body of `POST /api/v1/chat.postMessage`
#[derive(Debug, Clone, Serialize)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

/// Response of `POST /api/v1/chat.postMessage`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Value>,

    #[serde(default)]
    pub message: ChatMessage,
}

/// Body of `POST /api/v1/channels.create`
#[derive(Debug, Clone, Serialize)]
pub struct CreateChannelRequest<'a> {
    pub name: &'a str,
}

/// Response of `POST /api/v1/channels.create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelResponse {
    #[serde(default)]
    pub channel: Room,
}

/// Response of `GET /api/v1/users.list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Response of `GET /api/v1/users.info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub user: User,
}

/// Response of `GET /api/v1/channels.list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelList {
    #[serde(default)]
    pub channels: Vec<Room>,
}

/// Response of `GET /api/v1/groups.list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupList {
    #[serde(default)]
    pub groups: Vec<Room>,
}

/// Response of `GET /api/v1/channels.messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Decoded view of a response together with the body it came from
///
/// `body` is exactly what the server sent, unmodelled fields included.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub body: Value,
}

impl<T> Deref for ApiResponse<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}
