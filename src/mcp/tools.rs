//! MCP Tool definitions and handlers
//!
//! Defines all available tools and their implementations.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::config::rocketchat::{DEFAULT_MESSAGE_COUNT, MAX_MESSAGE_COUNT};
use crate::error::{ApiError, McpError, Result, RocketChatMcpError, ValidationError};
use crate::mcp::types::{CallToolResult, Tool};
use crate::rocketchat::types::{ChatMessage, Room, User};
use crate::rocketchat::RocketChatClient;

/// Tool handler
pub struct ToolHandler {
    client: Arc<RocketChatClient>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(client: Arc<RocketChatClient>) -> Self {
        Self { client }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def("list_users", "List all users available to the user", empty_schema()),
            tool_def("get_user_info", "Get information about a specific user", get_user_info_schema()),
            tool_def("send_message_in_channel", "Send a message to a Rocket.Chat channel", send_message_schema()),
            tool_def("list_channels", "List all channels available to the user", empty_schema()),
            tool_def("list_all_rooms", "List all rooms (channels and private groups) available to the user", empty_schema()),
            tool_def("create_channel", "Create a new public channel", create_channel_schema()),
            tool_def("get_channel_messages", "Get recent messages from a specific channel", get_channel_messages_schema()),
        ]
    }

    /// Call a tool by name
    ///
    /// Failures never escape: they become error results so the server keeps
    /// serving subsequent calls.
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        let result = match name {
            "list_users" => self.handle_list_users().await,
            "get_user_info" => self.handle_get_user_info(args).await,
            "send_message_in_channel" => self.handle_send_message(args).await,
            "list_channels" => self.handle_list_channels().await,
            "list_all_rooms" => self.handle_list_all_rooms().await,
            "create_channel" => self.handle_create_channel(args).await,
            "get_channel_messages" => self.handle_get_channel_messages(args).await,
            _ => Err(McpError::UnknownTool {
                name: name.to_string(),
            }
            .into()),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Tool {} failed: {}", name, e);
            CallToolResult::from_error(&e)
        })
    }

    // ==================== Tool Handlers ====================

    async fn handle_list_users(&self) -> Result<CallToolResult> {
        tracing::info!("list_users called");

        let users = self.client.list_users().await?;
        tracing::info!("Retrieved {} users", users.len());

        let text = if users.is_empty() {
            "No users found".to_string()
        } else {
            let listing: String = users.iter().map(format_user_summary).collect();
            format!("Available users:\n{}", listing)
        };

        Ok(CallToolResult::text(text).with_structured(users.body))
    }

    async fn handle_get_user_info(&self, args: Value) -> Result<CallToolResult> {
        #[derive(Deserialize, Validate)]
        struct Args {
            #[validate(length(min = 1, message = "must not be empty"))]
            username: String,
        }

        let args: Args = parse_args(args)?;
        tracing::info!("get_user_info called for username: {}", args.username);

        let user = self.client.user_info(&args.username).await?;
        let text = format!(
            "User Information:\nName: {}\nUsername: {}\nEmail: {}\nStatus: {}\nActive: {}\nRoles: {}",
            user.name.as_deref().unwrap_or("N/A"),
            user.username.as_deref().unwrap_or("N/A"),
            user.primary_email().unwrap_or("N/A"),
            user.status.as_deref().unwrap_or("N/A"),
            user.active.map(|a| a.to_string()).unwrap_or_else(|| "N/A".to_string()),
            user.roles.join(", "),
        );

        Ok(CallToolResult::text(text).with_structured(user.body))
    }

    async fn handle_send_message(&self, args: Value) -> Result<CallToolResult> {
        #[derive(Deserialize, Validate)]
        struct Args {
            #[validate(length(min = 1, message = "must not be empty"))]
            channel: String,
            #[validate(length(min = 1, message = "must not be empty"))]
            text: String,
        }

        let args: Args = parse_args(args)?;
        tracing::info!(
            "send_message_in_channel called - channel: {}, text length: {}",
            args.channel,
            args.text.len()
        );

        let sent = self.client.post_message(&args.channel, &args.text).await?;
        tracing::info!("Message sent successfully to channel: {}", args.channel);

        let text = format!(
            "Message sent successfully to {} (message ID: {})",
            args.channel, sent.message.id
        );
        Ok(CallToolResult::text(text).with_structured(sent.body))
    }

    async fn handle_list_channels(&self) -> Result<CallToolResult> {
        tracing::info!("list_channels called");

        let channels = self.client.list_channels().await?;
        tracing::info!("Retrieved {} channels", channels.len());

        let text = if channels.is_empty() {
            "No channels found".to_string()
        } else {
            let lines: Vec<String> = channels
                .iter()
                .map(|c| format!("- {}", format_room(c)))
                .collect();
            format!("Available channels:\n{}", lines.join("\n"))
        };

        Ok(CallToolResult::text(text).with_structured(channels.body))
    }

    async fn handle_list_all_rooms(&self) -> Result<CallToolResult> {
        tracing::info!("list_all_rooms called");

        let channels = self.client.list_channels().await?;

        // Private groups are best effort: servers that refuse groups.list
        // with `success: false` still get their channels listed.
        let groups = match self.client.list_groups().await {
            Ok(groups) => Some(groups),
            Err(RocketChatMcpError::Api(ApiError::Rejected { message })) => {
                tracing::warn!("groups.list rejected, listing channels only: {}", message);
                None
            }
            Err(e) => return Err(e),
        };
        let group_rooms: &[Room] = groups.as_ref().map(|g| g.data.as_slice()).unwrap_or(&[]);
        tracing::info!(
            "Retrieved {} channels and {} groups",
            channels.len(),
            group_rooms.len()
        );

        let lines: Vec<String> = channels
            .iter()
            .map(|c| format!("[Channel] {}", format_room(c)))
            .chain(group_rooms.iter().map(|g| format!("[Group] {}", format_room(g))))
            .collect();

        let text = if lines.is_empty() {
            "No rooms found".to_string()
        } else {
            format!("Available rooms:\n{}", lines.join("\n"))
        };

        let groups_body = groups.map(|g| g.body).unwrap_or(Value::Null);
        Ok(CallToolResult::text(text)
            .with_structured(json!({ "channels": channels.body, "groups": groups_body })))
    }

    async fn handle_create_channel(&self, args: Value) -> Result<CallToolResult> {
        #[derive(Deserialize, Validate)]
        struct Args {
            #[validate(length(min = 1, message = "must not be empty"))]
            name: String,
        }

        let args: Args = parse_args(args)?;
        tracing::info!("create_channel called for channel: {}", args.name);

        let channel = self.client.create_channel(&args.name).await?;
        tracing::info!(
            "Channel '{}' created successfully with ID: {}",
            args.name,
            channel.id
        );

        let text = format!(
            "Channel '{}' created successfully with ID: {}",
            args.name, channel.id
        );
        Ok(CallToolResult::text(text).with_structured(channel.body))
    }

    async fn handle_get_channel_messages(&self, args: Value) -> Result<CallToolResult> {
        #[derive(Deserialize, Validate)]
        struct Args {
            #[serde(alias = "roomId")]
            #[validate(length(min = 1, message = "must not be empty"))]
            room_id: String,
            #[serde(default = "default_message_count")]
            #[validate(range(min = 1, message = "must be at least 1"))]
            count: u32,
        }

        let args: Args = parse_args(args)?;
        let count = args.count.min(MAX_MESSAGE_COUNT);
        tracing::info!(
            "get_channel_messages called for room_id: {}, count: {}",
            args.room_id,
            count
        );

        let messages = self.client.channel_messages(&args.room_id, count).await?;
        tracing::info!(
            "Retrieved {} messages from room {}",
            messages.len(),
            args.room_id
        );

        let text = if messages.is_empty() {
            "No messages found in this channel".to_string()
        } else {
            let lines: Vec<String> = messages.iter().map(format_message).collect();
            format!(
                "Messages from channel (last {}):\n{}",
                messages.len(),
                lines.join("\n")
            )
        };

        Ok(CallToolResult::text(text).with_structured(messages.body))
    }
}

// ==================== Argument Handling ====================

/// Decode and validate tool arguments
///
/// Runs before any request is made, so a bad call never reaches the server.
fn parse_args<T: DeserializeOwned + Validate>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };

    let parsed: T = serde_json::from_value(args).map_err(|e| ValidationError::InvalidArguments {
        message: e.to_string(),
    })?;
    parsed.validate()?;

    Ok(parsed)
}

fn default_message_count() -> u32 {
    DEFAULT_MESSAGE_COUNT
}

// ==================== Formatting ====================

fn format_user_summary(user: &User) -> String {
    format!(
        "Username: {}\nEmail: {}\nName: {}\n",
        user.username.as_deref().unwrap_or("N/A"),
        user.primary_email().unwrap_or("N/A"),
        user.name.as_deref().unwrap_or("N/A"),
    )
}

fn format_room(room: &Room) -> String {
    format!("{} (ID: {})", room.name.as_deref().unwrap_or("N/A"), room.id)
}

fn format_message(message: &ChatMessage) -> String {
    let timestamp = message
        .ts
        .as_ref()
        .map(|ts| ts.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let user = message
        .author
        .as_ref()
        .and_then(|u| u.username.as_deref())
        .unwrap_or("Unknown");
    let text = message.msg.as_deref().unwrap_or("No content");

    format!("[{}] {}: {}", timestamp, user, text)
}

// ==================== Tool Schemas ====================

fn tool_def(name: &str, description: &str, schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: schema,
    }
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn get_user_info_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "username": {
                "type": "string",
                "description": "Username to get information about"
            }
        },
        "required": ["username"]
    })
}

fn send_message_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "channel": {
                "type": "string",
                "description": "Channel name (e.g. 'general' or '#general') or room ID"
            },
            "text": {
                "type": "string",
                "description": "Message text to send"
            }
        },
        "required": ["channel", "text"]
    })
}

fn create_channel_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "Name of the channel to create"
            }
        },
        "required": ["name"]
    })
}

fn get_channel_messages_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "room_id": {
                "type": "string",
                "description": "ID of the room/channel"
            },
            "count": {
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_MESSAGE_COUNT,
                "default": DEFAULT_MESSAGE_COUNT,
                "description": "Number of messages to retrieve (default: 20, max: 100)"
            }
        },
        "required": ["room_id"]
    })
}
