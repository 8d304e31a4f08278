//! MCP Client: JSON-RPC over stdio transport for the tool server.
//!
//! This module handles:
//! - Spawning and managing the MCP server child process
//! - JSON-RPC 2.0 communication over process stdio
//! - Tool discovery (`tools/list`) and invocation (`tools/call`)
//! - Argument validation against each tool's input schema
//! - Session lifecycle (start, initialize, idempotent close)

pub mod client;
pub mod errors;
pub mod lifecycle;
pub mod registry;
mod schema;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::McpClient;
pub use errors::McpError;
pub use lifecycle::{Session, SessionStatus};
pub use registry::ToolRegistry;
pub use types::{ContentBlock, ToolDescriptor, ToolInvocationResult, ToolServerConfig};
