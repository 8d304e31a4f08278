//! MCP Client: high-level interface for tool discovery and execution.
//!
//! Wraps a shared [`Session`] and keeps the most recent tool listing in a
//! [`ToolRegistry`]. The client never closes or replaces the session; that is
//! the lifecycle manager's job.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::errors::McpError;
use super::lifecycle::Session;
use super::registry::ToolRegistry;
use super::types::{ListToolsResult, ToolDescriptor, ToolInvocationResult};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default timeout for tool call execution (ms).
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Upper bound on `tools/list` pages, in case a server keeps returning cursors.
const MAX_LIST_PAGES: usize = 32;

// ─── McpClient ───────────────────────────────────────────────────────────────

/// Tool registry client over a single MCP session.
pub struct McpClient {
    session: Arc<Session>,
    /// Tools from the last successful `list_tools`.
    registry: RwLock<ToolRegistry>,
    /// Tool call timeout in milliseconds.
    call_timeout_ms: u64,
}

impl McpClient {
    /// Create a client over an initialized session.
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            registry: RwLock::new(ToolRegistry::new()),
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }

    /// Set the tool call timeout in milliseconds.
    pub fn with_call_timeout(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = timeout_ms;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ─── Discovery ───────────────────────────────────────────────────────

    /// Fetch the server's tools, in the order the server returns them.
    ///
    /// Follows `nextCursor` pagination and replaces the cached registry with
    /// the new listing.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut exhausted = false;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let result = self.session.send_request("tools/list", params).await?;
            let page: ListToolsResult =
                serde_json::from_value(result).map_err(|e| McpError::TransportError {
                    server: self.session.name().to_string(),
                    reason: format!("failed to parse tools/list response: {e}"),
                })?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    exhausted = true;
                    break;
                }
            }
        }

        if !exhausted {
            tracing::warn!(
                server = %self.session.name(),
                pages = MAX_LIST_PAGES,
                pending_cursor = cursor.as_deref().unwrap_or(""),
                tool_count = tools.len(),
                "tool listing truncated; server kept returning cursors"
            );
        }

        let registry = ToolRegistry::from_tools(tools);
        let listed = registry.all_tools().to_vec();
        tracing::debug!(
            server = %self.session.name(),
            tool_count = listed.len(),
            tools = ?registry.tool_names(),
            "tools listed"
        );

        if let Ok(mut cached) = self.registry.write() {
            *cached = registry;
        }
        Ok(listed)
    }

    /// Snapshot of the tools from the last listing.
    pub fn cached_registry(&self) -> ToolRegistry {
        self.registry
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Validate a call against the cached listing.
    pub fn validate_tool_call(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<(), McpError> {
        self.cached_registry().validate_tool_call(tool_name, arguments)
    }

    // ─── Tool Execution ──────────────────────────────────────────────────

    /// Execute a tool via `tools/call`.
    ///
    /// Run `validate_tool_call` first; the server is not asked whether the
    /// tool exists.
    /// A JSON-RPC error or a result flagged `isError` becomes `ToolFailed`.
    pub async fn invoke_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolInvocationResult, McpError> {
        let start = Instant::now();
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });

        let result = tokio::time::timeout(
            Duration::from_millis(self.call_timeout_ms),
            self.session.send_request("tools/call", Some(params)),
        )
        .await
        .map_err(|_| McpError::Timeout {
            tool: tool_name.to_string(),
            timeout_ms: self.call_timeout_ms,
        })?
        .map_err(|e| match e {
            McpError::ServerError { code, message, .. } => McpError::ToolFailed {
                tool: tool_name.to_string(),
                message: format!("[{code}] {message}"),
            },
            other => {
                if other.is_session_fatal() {
                    tracing::error!(
                        server = %self.session.name(),
                        tool = tool_name,
                        error = %other,
                        "tool call lost the session"
                    );
                }
                other
            }
        })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;

        let invocation: ToolInvocationResult =
            serde_json::from_value(result).map_err(|e| McpError::TransportError {
                server: self.session.name().to_string(),
                reason: format!("failed to parse tools/call response: {e}"),
            })?;

        if invocation.is_error {
            let message = invocation
                .first_text()
                .unwrap_or("tool reported an error without details")
                .to_string();
            tracing::warn!(tool = tool_name, elapsed_ms, error = %message, "tool call failed");
            return Err(McpError::ToolFailed {
                tool: tool_name.to_string(),
                message,
            });
        }

        tracing::info!(
            tool = tool_name,
            elapsed_ms,
            blocks = invocation.content.len(),
            "tool call succeeded"
        );
        Ok(invocation)
    }
}
