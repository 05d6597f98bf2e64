//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{McpError, Result, RocketChatMcpError};
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

/// MCP Server info
const SERVER_NAME: &str = "rocketchat";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Rocket.Chat
pub struct McpServer {
    /// Tool handler
    tool_handler: ToolHandler,

    /// Whether the client sent `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(tool_handler: ToolHandler) -> Self {
        Self {
            tool_handler,
            initialized: false,
        }
    }

    /// Whether the initialization handshake has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC until the reader is exhausted
    ///
    /// Messages are handled strictly one at a time. A line that is not valid
    /// UTF-8 gets a parse error and the loop moves on to the next line.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.handle_message(line).await
                }
                Err(e) => {
                    tracing::warn!("Received a line that is not valid UTF-8: {}", e);
                    Some(JsonRpcResponse::error(
                        None,
                        JsonRpcError::parse_error(format!("invalid UTF-8: {}", e)),
                    ))
                }
            };

            if let Some(response) = response {
                let mut response_str = serde_json::to_string(&response)?;
                response_str.push('\n');
                writer.write_all(response_str.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Input closed, shutting down MCP server");
        Ok(())
    }

    /// Handle an incoming JSON-RPC message
    ///
    /// Returns `None` for notifications, i.e. requests without an `id` member.
    /// A request with `"id": null` is still answered.
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to parse JSON-RPC message: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let Some(object) = value.as_object() else {
            tracing::warn!("JSON-RPC message is not an object");
            return Some(JsonRpcResponse::error(
                None,
                JsonRpcError::invalid_request("expected a single JSON object"),
            ));
        };

        let has_id = object.contains_key("id");
        let request: JsonRpcRequest = match serde_json::from_value(value.clone()) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Invalid JSON-RPC request: {}", e);
                let id = object
                    .get("id")
                    .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(e.to_string()),
                ));
            }
        };

        if !has_id {
            if request.method == methods::INITIALIZED {
                self.initialized = true;
                tracing::info!("Client initialization complete");
            } else {
                tracing::debug!("Ignoring notification: {}", request.method);
            }
            return None;
        }

        let id = request.id.clone();
        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(&request),
            methods::PING => Ok(serde_json::json!({})),
            methods::LIST_TOOLS => self.handle_list_tools(),
            methods::CALL_TOOL => Ok(self.handle_call_tool(&request).await),
            _ => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::method_not_found(&request.method),
                ))
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        })
    }

    /// Handle initialize request
    fn handle_initialize(&self, request: &JsonRpcRequest) -> Result<Value> {
        let params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let protocol_version = params
            .protocol_version
            .filter(|v| SUPPORTED_VERSIONS.contains(&v.as_str()))
            .unwrap_or_else(|| MCP_VERSION.to_string());

        tracing::info!("Initializing MCP session (protocol {})", protocol_version);

        let result = InitializeResult {
            protocol_version,
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.tool_handler.list_tools(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> Value {
        let result = match request.params.as_ref() {
            Some(p) => match serde_json::from_value::<CallToolParams>(p.clone()) {
                Ok(params) => {
                    self.tool_handler
                        .call_tool(&params.name, params.arguments)
                        .await
                }
                Err(e) => CallToolResult::from_error(&RocketChatMcpError::from(McpError::InvalidParams {
                    message: e.to_string(),
                })),
            },
            None => CallToolResult::from_error(&RocketChatMcpError::from(McpError::InvalidParams {
                message: "missing tool parameters".to_string(),
            })),
        };

        serde_json::to_value(&result).unwrap_or_else(|e| {
            serde_json::json!({
                "content": [{"type": "text", "text": format!("Error: {}", e)}],
                "isError": true
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rocketchat::{AuthSession, RocketChatClient};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn offline_server() -> McpServer {
        let session = AuthSession {
            user_id: "u".to_string(),
            auth_token: "t".to_string(),
        };
        let client =
            RocketChatClient::new("http://127.0.0.1:9", Duration::from_secs(1), session).unwrap();
        McpServer::new(ToolHandler::new(Arc::new(client)))
    }

    #[test]
    fn test_server_info() {
        assert_eq!(SERVER_NAME, "rocketchat");
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let mut server = offline_server();

        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"t","version":"1"}}}"#,
            )
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "rocketchat");
        assert!(result["capabilities"]["tools"].is_object());

        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{"protocolVersion":"1999-01-01"}}"#,
            )
            .await
            .unwrap();
        assert_eq!(response.result.unwrap()["protocolVersion"], MCP_VERSION);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let mut server = offline_server();
        assert!(!server.is_initialized());

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
        assert!(server.is_initialized());

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":3}}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_and_parse_error() {
        let mut server = offline_server();

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":"a","method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Some(RequestId::String("a".to_string())));
        assert_eq!(response.error.unwrap().code, -32601);

        let response = server.handle_message("{not json").await.unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_call_tool_without_params() {
        let mut server = offline_server();

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call"}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"]["kind"], "protocol");
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_request() {
        let mut server = offline_server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );

        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[0]["result"], json!({}));
        assert_eq!(lines[1]["result"]["tools"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8_line() {
        let mut server = offline_server();

        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.push(b'\n');
        input.extend_from_slice(b"\xff\xfe not text\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.extend_from_slice(b"\r\n");

        let mut output = Vec::new();
        server.serve(input.as_slice(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert!(lines[1]["id"].is_null());
        assert_eq!(lines[1]["error"]["code"], -32700);
        assert_eq!(lines[2]["id"], 2);
        assert_eq!(lines[2]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_malformed_requests_are_invalid() {
        let mut server = offline_server();

        let response = server
            .handle_message(r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#)
            .await
            .unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.error.unwrap().code, -32600);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":4}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Some(RequestId::Number(4)));
        assert_eq!(response.error.unwrap().code, -32600);

        let response = server.handle_message("42").await.unwrap();
        assert_eq!(response.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let mut server = offline_server();

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.result.unwrap(), json!({}));

        let value = serde_json::to_value(
            server
                .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
                .await
                .unwrap(),
        )
        .unwrap();
        assert!(value.as_object().unwrap().contains_key("id"));
        assert!(value["id"].is_null());
    }
}
