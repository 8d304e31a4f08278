//! Shared types for the MCP client.
//!
//! JSON-RPC 2.0 message types and MCP protocol structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// MCP protocol revision sent in the `initialize` handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// ─── JSON-RPC 2.0 ───────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: &str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response message (success or error).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: u64,
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

// ─── MCP Protocol Types ──────────────────────────────────────────────────────

/// A callable tool as advertised by `tools/list`.
///
/// Serialized with `input_schema` (snake case) because the same shape is sent
/// verbatim to the completion service and returned by `GET /tools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema", alias = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// `tools/list` response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(default, alias = "nextCursor")]
    pub next_cursor: Option<String>,
}

/// A single block of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

/// `tools/call` response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolInvocationResult {
    /// The first text block, if any. Other block kinds are ignored.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// MCP initialize response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(alias = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    #[serde(default, alias = "serverInfo")]
    pub server_info: Option<ServerInfo>,
}

/// Server info returned in the initialize response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

// ─── Configuration ──────────────────────────────────────────────────────────

/// How to launch the tool server process.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolServerConfig {
    /// Label used in logs and errors.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Interpreter to run the script with (e.g. `python`). When absent the
    /// script itself is executed.
    #[serde(default)]
    pub command: Option<String>,
    /// Extra arguments placed before the script path.
    #[serde(default)]
    pub args: Vec<String>,
    /// Server script or executable. Resolved to an absolute path before launch.
    pub script: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory for the child process.
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_server_name() -> String {
    "tools".to_string()
}
fn default_init_timeout_ms() -> u64 {
    30_000
}
fn default_call_timeout_ms() -> u64 {
    30_000
}

impl ToolServerConfig {
    /// Config for a server executable with all defaults.
    pub fn for_script(script: impl Into<String>) -> Self {
        Self {
            name: default_server_name(),
            command: None,
            args: Vec::new(),
            script: script.into(),
            env: HashMap::new(),
            cwd: None,
            init_timeout_ms: default_init_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

// ─── Standard MCP Error Codes ────────────────────────────────────────────────

/// Well-known JSON-RPC / MCP error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_serialization() {
        let req = JsonRpcRequest::new(1, "initialize", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
        assert!(!json.contains("params"));
    }

    #[test]
    fn test_json_rpc_error_response() {
        let json = r#"{
            "jsonrpc": "2.0",
            "id": 2,
            "error": {"code": -32601, "message": "Method not found"}
        }"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_tool_descriptor_accepts_camel_case_schema() {
        let json = r#"{
            "name": "send_email",
            "description": "Send an email",
            "inputSchema": {"type": "object", "required": ["to"]}
        }"#;
        let tool: ToolDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(tool.input_schema["required"][0], "to");

        // Re-serialized in the completion-service shape.
        let out = serde_json::to_value(&tool).unwrap();
        assert!(out.get("input_schema").is_some());
        assert!(out.get("inputSchema").is_none());
    }

    #[test]
    fn test_tool_descriptor_defaults_schema() {
        let tool: ToolDescriptor = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn test_first_text_skips_other_blocks() {
        let json = r#"{
            "content": [
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "audio", "data": "..."},
                {"type": "text", "text": "sent"},
                {"type": "text", "text": "second"}
            ]
        }"#;
        let result: ToolInvocationResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content[1], ContentBlock::Unknown);
        assert_eq!(result.first_text(), Some("sent"));
    }

    #[test]
    fn test_first_text_none_without_text_blocks() {
        let result = ToolInvocationResult {
            content: vec![ContentBlock::Resource {
                resource: serde_json::json!({"uri": "file:///tmp/x"}),
            }],
            is_error: false,
        };
        assert!(result.first_text().is_none());
    }

    #[test]
    fn test_tool_server_config_defaults() {
        let config: ToolServerConfig =
            serde_yaml::from_str("script: ./mcp_server.py\ncommand: python\n").unwrap();
        assert_eq!(config.name, "tools");
        assert_eq!(config.command.as_deref(), Some("python"));
        assert_eq!(config.init_timeout_ms, 30_000);
        assert_eq!(config.call_timeout_ms, 30_000);
        assert!(config.args.is_empty());
    }
}
