//! MCP Client error types.

use thiserror::Error;

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The server process could not be started (missing script, spawn failure).
    #[error("failed to spawn server '{name}': {reason}")]
    SpawnFailed {
        name: String,
        reason: String,
    },

    /// The initialization handshake failed or timed out.
    #[error("server '{name}' initialization failed: {reason}")]
    InitFailed {
        name: String,
        reason: String,
    },

    /// JSON-RPC communication error (malformed message, I/O error).
    #[error("transport error for server '{server}': {reason}")]
    TransportError {
        server: String,
        reason: String,
    },

    /// A session operation was attempted before the handshake completed.
    #[error("session with '{server}' is not initialized")]
    NotInitialized {
        server: String,
    },

    /// The session was closed and cannot be reused.
    #[error("session with '{server}' is closed")]
    SessionClosed {
        server: String,
    },

    /// An earlier stream failure left the session unusable.
    #[error("session with '{server}' is broken: {reason}; reconnect required")]
    SessionBroken {
        server: String,
        reason: String,
    },

    /// Server returned a JSON-RPC error response.
    #[error("server error [{code}]: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The tool ran but reported a failure (`isError: true`).
    #[error("tool '{tool}' failed: {message}")]
    ToolFailed {
        tool: String,
        message: String,
    },

    /// Tool not found in the registry. `suggestions` holds near-miss names.
    #[error("unknown tool: '{name}'")]
    UnknownTool {
        name: String,
        suggestions: Vec<String>,
    },

    /// Tool call arguments failed schema validation.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments {
        tool: String,
        reason: String,
    },

    /// A tool call timed out.
    #[error("tool call '{tool}' timed out after {timeout_ms}ms")]
    Timeout {
        tool: String,
        timeout_ms: u64,
    },
}

impl McpError {
    /// Whether this error means the session itself is unusable (as opposed
    /// to a single failed request).
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            McpError::SpawnFailed { .. }
                | McpError::InitFailed { .. }
                | McpError::TransportError { .. }
                | McpError::NotInitialized { .. }
                | McpError::SessionClosed { .. }
                | McpError::SessionBroken { .. }
        )
    }
}
