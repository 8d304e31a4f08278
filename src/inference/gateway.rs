//! The completion gateway seam used by the orchestrator.

use async_trait::async_trait;

use crate::mcp_client::ToolDescriptor;

use super::errors::InferenceError;
use super::types::Plan;

/// Abstract client for the text-completion service.
///
/// Two call shapes: a constrained tool choice that must name exactly one tool
/// (or `"none"`), and a free-form answer. Implementations bound every call
/// with a timeout.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Decide which tool, if any, handles `user_message`.
    ///
    /// `tools` is sent in the given order. A reply without any tool selection
    /// fails with [`InferenceError::NoToolUse`]; it is never read as "none".
    async fn plan(
        &self,
        user_message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<Plan, InferenceError>;

    /// Phrase the final answer, optionally grounded on a tool's text output.
    async fn respond(
        &self,
        user_message: &str,
        tool_result: Option<&str>,
    ) -> Result<String, InferenceError>;
}
