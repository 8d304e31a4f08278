//! ToolRouter: the orchestrator's view of the tool server.
//!
//! The orchestrator lists what exists, checks the planned call against that
//! listing, then calls one thing. Keeping them behind a trait lets the
//! pipeline run against an in-memory fake in tests and against [`McpClient`]
//! in the service.

use async_trait::async_trait;

use crate::mcp_client::{McpClient, McpError, ToolDescriptor, ToolInvocationResult};

/// Tool discovery and invocation.
#[async_trait]
pub trait ToolRouter: Send + Sync {
    /// Current tool listing, in server order.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError>;

    /// Check a planned call against the most recent listing: the name must be
    /// listed (`UnknownTool`) and the arguments must match its input schema
    /// (`InvalidArguments`).
    fn validate_tool_call(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<(), McpError>;

    /// Invoke a tool once. Call `validate_tool_call` first.
    async fn invoke_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolInvocationResult, McpError>;
}

#[async_trait]
impl ToolRouter for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        McpClient::list_tools(self).await
    }

    fn validate_tool_call(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<(), McpError> {
        McpClient::validate_tool_call(self, name, arguments)
    }

    async fn invoke_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolInvocationResult, McpError> {
        McpClient::invoke_tool(self, name, arguments).await
    }
}
