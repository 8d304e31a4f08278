//! MCP JSON-RPC protocol handler over stdio.
//!
//! Reads one JSON-RPC message per line, answers requests on the writer, and
//! ignores notifications. Diagnostics go to the log (stderr), never stdout.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::mcp_client::types::{error_codes, PROTOCOL_VERSION};
use crate::mcp_client::{ContentBlock, ToolInvocationResult};

use super::{delivery_report, MailError, MailService, SendEmailArgs, SEND_EMAIL};

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    jsonrpc: String,
    /// Absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct OutgoingResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<OutgoingError>,
}

#[derive(Debug, Serialize)]
struct OutgoingError {
    code: i32,
    message: String,
}

impl OutgoingResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(OutgoingError {
                code,
                message: message.into(),
            }),
        }
    }
}

// ─── Server loop ────────────────────────────────────────────────────────────

/// Serve on the process's stdin/stdout until stdin closes.
pub async fn run_stdio(service: MailService) -> std::io::Result<()> {
    run_server(
        &service,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serve on any line-oriented reader/writer pair until the reader hits EOF.
pub async fn run_server<R, W>(service: &MailService, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    info!("mail tool server running");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: IncomingMessage = match serde_json::from_str(line) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "unparseable message");
                let resp = OutgoingResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {e}"),
                );
                write_response(&mut writer, &resp).await?;
                continue;
            }
        };

        let Some(id) = message.id.clone() else {
            debug!(method = %message.method, "notification");
            continue;
        };

        let response = if message.jsonrpc != "2.0" {
            OutgoingResponse::error(id, error_codes::INVALID_REQUEST, "Invalid JSON-RPC version")
        } else {
            handle_request(service, id, &message.method, &message.params).await
        };
        write_response(&mut writer, &response).await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &OutgoingResponse,
) -> std::io::Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

async fn handle_request(
    service: &MailService,
    id: Value,
    method: &str,
    params: &Value,
) -> OutgoingResponse {
    match method {
        "initialize" => OutgoingResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": "toolbridge-mail",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "ping" => OutgoingResponse::success(id, json!({})),
        "tools/list" => OutgoingResponse::success(
            id,
            json!({
                "tools": [{
                    "name": SEND_EMAIL,
                    "description": "Send an email to a contact. Recipients are contact \
                                    names (e.g. \"alice\"), not email addresses.",
                    "inputSchema": MailService::send_email_schema(),
                }]
            }),
        ),
        "tools/call" => handle_tools_call(service, id, params).await,
        other => OutgoingResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Unknown method: {other}"),
        ),
    }
}

async fn handle_tools_call(service: &MailService, id: Value, params: &Value) -> OutgoingResponse {
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    if name.is_empty() {
        return OutgoingResponse::error(id, error_codes::INVALID_PARAMS, "Missing tool name in params");
    }
    if name != SEND_EMAIL {
        return OutgoingResponse::error(
            id,
            error_codes::INVALID_PARAMS,
            format!("Unknown tool: {name}"),
        );
    }

    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let outcome = match serde_json::from_value::<SendEmailArgs>(arguments) {
        Ok(args) => service.send_email(args).await,
        Err(e) => Err(MailError::InvalidArguments {
            reason: e.to_string(),
        }),
    };

    let result = match outcome {
        Ok(record) => text_result(delivery_report(&record), false),
        Err(e) => {
            warn!(tool = SEND_EMAIL, error = %e, "tool call failed");
            text_result(e.to_string(), true)
        }
    };

    match serde_json::to_value(&result) {
        Ok(value) => OutgoingResponse::success(id, value),
        Err(e) => OutgoingResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

fn text_result(text: String, is_error: bool) -> ToolInvocationResult {
    ToolInvocationResult {
        content: vec![ContentBlock::Text { text }],
        is_error,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::{ContactDirectory, Outbox};
    use super::*;

    async fn exchange(service: &MailService, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        run_server(service, input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn service(dir: &tempfile::TempDir) -> MailService {
        MailService::new(
            ContactDirectory::from_entries([("alice", "alice@example.com")]),
            Outbox::new(dir.path().join("outbox.jsonl")),
        )
    }

    #[tokio::test]
    async fn handshake_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#, "\n",
        );
        let replies = exchange(&service(&dir), input).await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(replies[1]["result"]["tools"][0]["name"], "send_email");
        assert!(replies[1]["result"]["tools"][0]["inputSchema"]["required"].is_array());
    }

    #[tokio::test]
    async fn unknown_recipient_is_tool_error_not_crash() {
        let dir = tempfile::tempdir().unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"send_email","arguments":{"to":"bob","subject":"s","body":"b"}}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#, "\n",
        );
        let replies = exchange(&service(&dir), input).await;

        assert_eq!(replies[0]["result"]["isError"], true);
        assert_eq!(
            replies[0]["result"]["content"][0]["text"],
            "address not found for 'bob'"
        );
        assert_eq!(replies[1]["id"], 8);
    }

    #[tokio::test]
    async fn successful_send_reports_message_id() {
        let dir = tempfile::tempdir().unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"send_email","arguments":{"to":"alice","subject":"Report","body":"ready"}}}"#, "\n",
        );
        let replies = exchange(&service(&dir), input).await;

        assert_eq!(replies[0]["result"]["isError"], false);
        let text = replies[0]["result"]["content"][0]["text"].as_str().unwrap();
        let report: Value = serde_json::from_str(text).unwrap();
        assert_eq!(report["status"], "success");
        assert_eq!(report["to"], "alice@example.com");
    }

    #[tokio::test]
    async fn protocol_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"delete_all"}}"#, "\n",
            r#"{"jsonrpc":"1.0","id":6,"method":"ping"}"#, "\n",
        );
        let replies = exchange(&service(&dir), input).await;

        assert_eq!(replies[0]["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(replies[1]["error"]["code"], error_codes::METHOD_NOT_FOUND);
        assert_eq!(replies[2]["error"]["code"], error_codes::INVALID_PARAMS);
        assert_eq!(replies[3]["error"]["code"], error_codes::INVALID_REQUEST);
    }
}
