//! Agent Core error types.
//!
//! One variant per failure kind a request can end in. Lower-level errors
//! (`McpError`, `InferenceError`) are folded in through the `From` impls so
//! the orchestrator can use `?` across both collaborators.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::mcp_client::McpError;

/// Errors that end a request or prevent the service from starting.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The tool server process could not be started.
    #[error("process launch failed: {reason}")]
    ProcessLaunch { reason: String },

    /// Handshake failure, malformed frame, closed or broken session.
    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    /// The completion service timed out, was unreachable, or refused the call.
    #[error("completion service unavailable: {reason}")]
    GatewayUnavailable { reason: String },

    /// The planner did not produce a usable tool selection.
    #[error("planning failed: {reason}")]
    Planning { reason: String },

    /// The planner named a tool the server did not list.
    #[error("tool '{name}' not found{}", format_suggestions(suggestions))]
    ToolNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    /// The tool ran and failed, timed out, or returned no text.
    #[error("tool execution failed: {reason}")]
    ToolExecution { reason: String },

    /// Planned arguments do not match the tool's input schema.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Startup configuration is unusable.
    #[error("config error: {reason}")]
    Config { reason: String },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

impl AgentError {
    /// Short machine-readable kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::ProcessLaunch { .. } => "process_launch",
            AgentError::Protocol { .. } => "protocol",
            AgentError::GatewayUnavailable { .. } => "gateway_unavailable",
            AgentError::Planning { .. } => "planning",
            AgentError::ToolNotFound { .. } => "tool_not_found",
            AgentError::ToolExecution { .. } => "tool_execution",
            AgentError::InvalidArguments { .. } => "invalid_arguments",
            AgentError::Config { .. } => "config",
        }
    }
}

impl From<McpError> for AgentError {
    fn from(e: McpError) -> Self {
        match e {
            McpError::SpawnFailed { .. } => AgentError::ProcessLaunch {
                reason: e.to_string(),
            },
            McpError::InitFailed { .. }
            | McpError::TransportError { .. }
            | McpError::NotInitialized { .. }
            | McpError::SessionClosed { .. }
            | McpError::SessionBroken { .. } => AgentError::Protocol {
                reason: e.to_string(),
            },
            McpError::ServerError { .. }
            | McpError::ToolFailed { .. }
            | McpError::Timeout { .. } => AgentError::ToolExecution {
                reason: e.to_string(),
            },
            McpError::UnknownTool { name, suggestions } => {
                AgentError::ToolNotFound { name, suggestions }
            }
            McpError::InvalidArguments { tool, reason } => {
                AgentError::InvalidArguments { tool, reason }
            }
        }
    }
}

impl From<InferenceError> for AgentError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::NoToolUse { .. } => AgentError::Planning {
                reason: e.to_string(),
            },
            InferenceError::ConfigError { reason } => AgentError::Config { reason },
            // Unreachable, refused, or answered with unusable content.
            _ => AgentError::GatewayUnavailable {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcp_mapping() {
        let launch: AgentError = McpError::SpawnFailed {
            name: "tools".into(),
            reason: "script not found".into(),
        }
        .into();
        assert!(matches!(launch, AgentError::ProcessLaunch { .. }));

        let broken: AgentError = McpError::SessionBroken {
            server: "tools".into(),
            reason: "stdout closed".into(),
        }
        .into();
        assert!(matches!(broken, AgentError::Protocol { .. }));

        let timeout: AgentError = McpError::Timeout {
            tool: "send_email".into(),
            timeout_ms: 30_000,
        }
        .into();
        assert!(matches!(timeout, AgentError::ToolExecution { .. }));

        let invalid: AgentError = McpError::InvalidArguments {
            tool: "send_email".into(),
            reason: "$.to: missing required property".into(),
        }
        .into();
        assert_eq!(invalid.kind(), "invalid_arguments");
    }

    #[test]
    fn test_inference_mapping() {
        let timeout: AgentError = InferenceError::Timeout { duration_ms: 35_000 }.into();
        assert!(matches!(timeout, AgentError::GatewayUnavailable { .. }));

        let http: AgentError = InferenceError::HttpError {
            status: 529,
            body: "overloaded".into(),
        }
        .into();
        assert!(matches!(http, AgentError::GatewayUnavailable { .. }));

        let planning: AgentError = InferenceError::NoToolUse { stop_reason: None }.into();
        assert!(matches!(planning, AgentError::Planning { .. }));
    }

    #[test]
    fn test_tool_not_found_message() {
        let err = AgentError::ToolNotFound {
            name: "send_mail".into(),
            suggestions: vec!["send_email".into()],
        };
        assert_eq!(
            err.to_string(),
            "tool 'send_mail' not found (did you mean: send_email?)"
        );

        let bare = AgentError::ToolNotFound {
            name: "x".into(),
            suggestions: vec![],
        };
        assert_eq!(bare.to_string(), "tool 'x' not found");
    }
}
