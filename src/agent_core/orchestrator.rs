//! Request orchestrator: plan → (direct | tool) → respond.
//!
//! Pipeline per user message:
//! 1. **Plan**: fetch the tool list fresh, ask the gateway to pick one tool
//!    (or `none`)
//! 2. **Execute**: when a tool was picked: membership check, schema check,
//!    exactly one `tools/call`, first text block as the result
//! 3. **Respond**: free-form answer, grounded on the tool result if any
//!
//! Any failure aborts the request with one [`AgentError`]; nothing partial is
//! returned. The orchestrator holds non-owning handles to its collaborators
//! and never closes the session behind the router.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::inference::{CompletionGateway, Plan, ToolCall};
use crate::mcp_client::ToolDescriptor;

use super::errors::AgentError;
use super::tool_router::ToolRouter;

/// Max bytes of tool output copied into log fields.
const LOG_PREVIEW_BYTES: usize = 200;

// ─── Stages ─────────────────────────────────────────────────────────────────

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Planned,
    DirectResponse,
    ToolExecuted,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Received => "RECEIVED",
            Stage::Planned => "PLANNED",
            Stage::DirectResponse => "DIRECT_RESPONSE",
            Stage::ToolExecuted => "TOOL_EXECUTED",
            Stage::Responded => "RESPONDED",
        };
        f.write_str(s)
    }
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// The per-request pipeline over one tool router and one completion gateway.
#[derive(Clone)]
pub struct Orchestrator {
    tools: Arc<dyn ToolRouter>,
    gateway: Arc<dyn CompletionGateway>,
}

impl Orchestrator {
    pub fn new(tools: Arc<dyn ToolRouter>, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { tools, gateway }
    }

    /// The tool listing, straight from the router.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        Ok(self.tools.list_tools().await?)
    }

    /// Answer one user message.
    pub async fn run(&self, user_message: &str) -> Result<String, AgentError> {
        let request_id = Uuid::new_v4();
        let start = Instant::now();
        let result = self
            .run_stages(request_id, user_message)
            .instrument(tracing::info_span!("chat", %request_id))
            .await;

        match &result {
            Ok(answer) => tracing::info!(
                %request_id,
                stage = %Stage::Responded,
                elapsed_ms = start.elapsed().as_millis() as u64,
                response_len = answer.len(),
                "request complete"
            ),
            Err(e) => tracing::warn!(
                %request_id,
                kind = e.kind(),
                error = %e,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "request failed"
            ),
        }
        result
    }

    async fn run_stages(&self, request_id: Uuid, user_message: &str) -> Result<String, AgentError> {
        tracing::info!(
            %request_id,
            stage = %Stage::Received,
            message_len = user_message.len(),
            "message received"
        );

        // ── Plan ────────────────────────────────────────────────────────────
        let tools = self.tools.list_tools().await?;
        let plan = self.gateway.plan(user_message, &tools).await?;
        tracing::info!(
            %request_id,
            stage = %Stage::Planned,
            tool = plan.tool_name(),
            offered = tools.len(),
            "plan selected"
        );

        // ── Execute ─────────────────────────────────────────────────────────
        let tool_result = match plan {
            Plan::Direct => {
                tracing::info!(%request_id, stage = %Stage::DirectResponse, "no tool needed");
                None
            }
            Plan::Tool(call) => Some(self.execute(request_id, call).await?),
        };

        // ── Respond ─────────────────────────────────────────────────────────
        let answer = self
            .gateway
            .respond(user_message, tool_result.as_deref())
            .await?;
        Ok(answer)
    }

    /// Check and run the planned call. Returns the tool's first text block.
    ///
    /// Validation runs against the listing fetched for this request's plan.
    async fn execute(&self, request_id: Uuid, call: ToolCall) -> Result<String, AgentError> {
        self.tools.validate_tool_call(&call.name, &call.arguments)?;

        let start = Instant::now();
        let result = self.tools.invoke_tool(&call.name, call.arguments).await?;

        let text = result
            .first_text()
            .ok_or_else(|| AgentError::ToolExecution {
                reason: format!("tool '{}' returned no text content", call.name),
            })?
            .to_string();

        tracing::info!(
            %request_id,
            stage = %Stage::ToolExecuted,
            tool = %call.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            result_preview = truncate_utf8(&text, LOG_PREVIEW_BYTES),
            "tool executed"
        );
        Ok(text)
    }
}

/// Truncate to at most `max_bytes` without splitting a character.
fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ─── Tests ──────────────────────────────────────────────────────────────────
