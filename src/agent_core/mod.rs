//! Agent Core: the request pipeline.
//!
//! Submodules:
//! - `orchestrator`: plan → execute → respond for one user message
//! - `tool_router`: the tool-server seam the orchestrator depends on
//! - `errors`: request-level error taxonomy

pub mod errors;
pub mod orchestrator;
pub mod tool_router;

// Re-exports for convenience
pub use errors::AgentError;
pub use orchestrator::{Orchestrator, Stage};
pub use tool_router::ToolRouter;
