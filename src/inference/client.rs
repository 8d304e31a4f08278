//! Anthropic Messages API client.
//!
//! Implements [`CompletionGateway`] over `POST /v1/messages`. Each call is a
//! single bounded HTTP request; there is no retry or fallback.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::mcp_client::ToolDescriptor;

use super::config::CompletionConfig;
use super::errors::InferenceError;
use super::gateway::CompletionGateway;
use super::prompts;
use super::types::{
    ChatMessage, MessagesRequest, MessagesResponse, Plan, ResponseBlock, ToolCall, ToolChoice,
    NO_TOOL,
};

// ─── AnthropicClient ─────────────────────────────────────────────────────────

/// Client for the completion endpoint.
///
/// Holds one pooled HTTP client; concurrent calls from different requests run
/// in parallel on separate connections.
pub struct AnthropicClient {
    http: HttpClient,
    config: CompletionConfig,
    url: String,
}

impl AnthropicClient {
    /// Build a client. Does NOT check connectivity; that happens on the
    /// first request.
    pub fn new(config: CompletionConfig) -> Result<Self, InferenceError> {
        config.validate()?;
        let url = config.messages_url();

        let http = HttpClient::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config, url })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one request and decode the reply.
    async fn send(&self, body: &MessagesRequest) -> Result<MessagesResponse, InferenceError> {
        let start = Instant::now();

        // Log the request metadata (not the full body, which can be huge)
        tracing::info!(
            url = %self.url,
            model = %body.model,
            tool_count = body.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            constrained = body.tool_choice.is_some(),
            max_tokens = body.max_tokens,
            "completion request"
        );

        let response = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body_text, "completion request rejected");
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let parsed: MessagesResponse =
            serde_json::from_str(&body_text).map_err(|e| InferenceError::InvalidResponse {
                reason: format!("failed to parse messages response: {e}"),
            })?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            blocks = parsed.content.len(),
            "completion response"
        );
        Ok(parsed)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout {
                duration_ms: self.config.timeout_ms,
            }
        } else {
            InferenceError::ConnectionFailed {
                endpoint: self.url.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl CompletionGateway for AnthropicClient {
    async fn plan(
        &self,
        user_message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<Plan, InferenceError> {
        let body = planning_request(&self.config, user_message, tools);
        let response = self.send(&body).await?;
        extract_plan(&response)
    }

    async fn respond(
        &self,
        user_message: &str,
        tool_result: Option<&str>,
    ) -> Result<String, InferenceError> {
        let body = response_request(&self.config, user_message, tool_result);
        let response = self.send(&body).await?;
        extract_text(&response)
    }
}

// ─── Request Building ────────────────────────────────────────────────────────

/// Build the constrained tool-choice request.
///
/// The synthetic `none` tool is appended after the server's tools. A server
/// tool that is itself called `none` would make the two indistinguishable, so
/// it is left out of the offer.
pub fn planning_request(
    config: &CompletionConfig,
    user_message: &str,
    tools: &[ToolDescriptor],
) -> MessagesRequest {
    let mut offered: Vec<ToolDescriptor> = tools
        .iter()
        .filter(|t| {
            let shadowed = t.name == NO_TOOL;
            if shadowed {
                tracing::warn!("server tool named '{NO_TOOL}' withheld from planning");
            }
            !shadowed
        })
        .cloned()
        .collect();
    offered.push(prompts::no_tool_descriptor());

    MessagesRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        messages: vec![ChatMessage::user(prompts::planning_prompt(user_message))],
        tools: Some(offered),
        tool_choice: Some(ToolChoice::Any),
    }
}

/// Build the free-form answer request.
pub fn response_request(
    config: &CompletionConfig,
    user_message: &str,
    tool_result: Option<&str>,
) -> MessagesRequest {
    MessagesRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        messages: vec![ChatMessage::user(prompts::response_prompt(
            user_message,
            tool_result,
        ))],
        tools: None,
        tool_choice: None,
    }
}

// ─── Response Parsing ────────────────────────────────────────────────────────

/// Turn the first `tool_use` block into a [`Plan`].
pub fn extract_plan(response: &MessagesResponse) -> Result<Plan, InferenceError> {
    let tool_use = response.content.iter().find_map(|block| match block {
        ResponseBlock::ToolUse { id, name, input } => Some((id, name, input)),
        _ => None,
    });

    match tool_use {
        Some((_, name, _)) if name == NO_TOOL => Ok(Plan::Direct),
        Some((id, name, input)) => Ok(Plan::Tool(ToolCall {
            id: id.clone(),
            name: name.clone(),
            arguments: if input.is_null() {
                serde_json::json!({})
            } else {
                input.clone()
            },
        })),
        None => Err(InferenceError::NoToolUse {
            stop_reason: response.stop_reason.clone(),
        }),
    }
}

/// The first text block of the reply.
pub fn extract_text(response: &MessagesResponse) -> Result<String, InferenceError> {
    response
        .content
        .iter()
        .find_map(|block| match block {
            ResponseBlock::Text { text } => Some(text.clone()),
            _ => None,
        })
        .ok_or(InferenceError::MissingText)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(content: serde_json::Value) -> MessagesResponse {
        serde_json::from_value(json!({
            "content": content,
            "stop_reason": "end_turn"
        }))
        .unwrap()
    }

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: String::new(),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_new_rejects_missing_key() {
        assert!(matches!(
            AnthropicClient::new(CompletionConfig::default()),
            Err(InferenceError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_planning_request_appends_none_in_order() {
        let config = CompletionConfig::default();
        let req = planning_request(&config, "hi", &[tool("b_tool"), tool("a_tool")]);
        let names: Vec<&str> = req
            .tools
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["b_tool", "a_tool", "none"]);
        assert_eq!(req.tool_choice, Some(ToolChoice::Any));
        assert_eq!(req.max_tokens, 1000);
    }

    #[test]
    fn test_planning_request_withholds_server_none_tool() {
        let config = CompletionConfig::default();
        let req = planning_request(&config, "hi", &[tool("none"), tool("send_email")]);
        let tools = req.tools.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[1], prompts::no_tool_descriptor());
    }

    #[test]
    fn test_response_request_has_no_tools() {
        let config = CompletionConfig::default();
        let req = response_request(&config, "hi", Some("done"));
        assert!(req.tools.is_none());
        assert!(req.tool_choice.is_none());
        assert!(req.messages[0].content.contains("Tool result: done"));
    }

    #[test]
    fn test_extract_plan_tool() {
        let resp = response(json!([
            {"type": "text", "text": "I'll send that."},
            {"type": "tool_use", "id": "toolu_1", "name": "send_email",
             "input": {"to": "alice", "subject": "Report", "body": "ready"}},
            {"type": "tool_use", "id": "toolu_2", "name": "none", "input": {}}
        ]));
        match extract_plan(&resp).unwrap() {
            Plan::Tool(call) => {
                assert_eq!(call.id, "toolu_1");
                assert_eq!(call.name, "send_email");
                assert_eq!(call.arguments["to"], "alice");
            }
            Plan::Direct => panic!("expected a tool plan"),
        }
    }

    #[test]
    fn test_extract_plan_none() {
        let resp = response(json!([
            {"type": "tool_use", "id": "toolu_1", "name": "none", "input": {}}
        ]));
        assert_eq!(extract_plan(&resp).unwrap(), Plan::Direct);
    }

    #[test]
    fn test_extract_plan_without_tool_use_is_error() {
        let resp = response(json!([{"type": "text", "text": "Sure!"}]));
        match extract_plan(&resp).unwrap_err() {
            InferenceError::NoToolUse { stop_reason } => {
                assert_eq!(stop_reason.as_deref(), Some("end_turn"));
            }
            other => panic!("expected NoToolUse, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_plan_null_input_becomes_empty_object() {
        let resp = response(json!([
            {"type": "tool_use", "id": "t", "name": "list_contacts"}
        ]));
        match extract_plan(&resp).unwrap() {
            Plan::Tool(call) => assert_eq!(call.arguments, json!({})),
            Plan::Direct => panic!("expected a tool plan"),
        }
    }

    #[test]
    fn test_extract_text() {
        let resp = response(json!([
            {"type": "tool_use", "id": "t", "name": "x", "input": {}},
            {"type": "text", "text": "first"},
            {"type": "text", "text": "second"}
        ]));
        assert_eq!(extract_text(&resp).unwrap(), "first");

        let empty = response(json!([]));
        assert!(matches!(extract_text(&empty), Err(InferenceError::MissingText)));
    }
}
