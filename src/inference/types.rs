//! Shared types for the completion client.
//!
//! These mirror the Anthropic Messages API, used for both request building
//! and response parsing, plus the [`Plan`] the planning call produces.

use serde::{Deserialize, Serialize};

use crate::mcp_client::ToolDescriptor;

/// Tool name the planner selects when no real tool applies.
pub const NO_TOOL: &str = "none";

// ─── Request Types ───────────────────────────────────────────────────────────

/// Message role. Every request is a single user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// A single message in the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// How the model may use the offered tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model must call exactly one of the offered tools.
    Any,
}

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    /// Tool descriptors are sent verbatim (`name`, `description`, `input_schema`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// A typed block in the response `content` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Response body from `POST /v1/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A tool call selected by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Id of the `tool_use` block that produced this call.
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The planning decision for one user message.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// No tool applies; answer directly.
    Direct,
    /// Invoke one tool, then answer with its result.
    Tool(ToolCall),
}

impl Plan {
    /// The selected tool name, or `"none"` for a direct answer.
    pub fn tool_name(&self) -> &str {
        match self {
            Plan::Direct => NO_TOOL,
            Plan::Tool(call) => &call.name,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
