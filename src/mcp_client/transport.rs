//! JSON-RPC over stdio transport.
//!
//! Handles low-level communication with the MCP server child process:
//! - Writing JSON-RPC requests to stdin
//! - Reading JSON-RPC responses from stdout
//! - Line-delimited JSON protocol (one JSON object per line)
//!
//! One request is in flight at a time. The write and the matching read happen
//! under a single lock, so concurrent callers can never interleave frames on
//! the shared stream pair.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::errors::McpError;
use super::types::{JsonRpcRequest, JsonRpcResponse};

// ─── Request ID Generator ────────────────────────────────────────────────────

/// Global monotonic request ID counter.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Transport ───────────────────────────────────────────────────────────────

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// The stream pair. `writer` is taken on close.
struct Channel {
    writer: Option<BoxedWriter>,
    reader: BoxedReader,
}

/// Bi-directional JSON-RPC transport over a child process's stdio.
pub struct StdioTransport {
    server_name: String,
    channel: Mutex<Channel>,
    /// First stream failure. Once set, every request fails fast.
    broken: OnceLock<String>,
}

impl StdioTransport {
    /// Create a new transport from a writable request stream (the child's
    /// stdin) and a readable response stream (the child's stdout).
    pub fn new<W, R>(server_name: &str, writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            server_name: server_name.to_string(),
            channel: Mutex::new(Channel {
                writer: Some(Box::new(writer)),
                reader: BufReader::new(reader),
            }),
            broken: OnceLock::new(),
        }
    }

    /// The reason the transport stopped being usable, if it did.
    pub fn broken_reason(&self) -> Option<&str> {
        self.broken.get().map(String::as_str)
    }

    fn mark_broken(&self, reason: &str) -> McpError {
        if self.broken.set(reason.to_string()).is_ok() {
            tracing::error!(server = %self.server_name, reason, "transport broken");
        }
        McpError::TransportError {
            server: self.server_name.clone(),
            reason: reason.to_string(),
        }
    }

    fn check_usable(&self) -> Result<(), McpError> {
        match self.broken.get() {
            Some(reason) => Err(McpError::SessionBroken {
                server: self.server_name.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Send a JSON-RPC request and wait for the matching response.
    ///
    /// Writes one line of JSON, then reads lines until a response with the
    /// same `id` arrives. Lines that are not JSON-RPC responses (server log
    /// output) and responses to other ids (late replies to a request that
    /// timed out) are skipped.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        self.check_usable()?;

        let id = next_request_id();
        let req = JsonRpcRequest::new(id, method, params);

        let mut json = serde_json::to_string(&req).map_err(|e| McpError::TransportError {
            server: self.server_name.clone(),
            reason: format!("failed to serialize request: {e}"),
        })?;
        json.push('\n');

        let mut channel = self.channel.lock().await;
        // The lock may have been held by a request that broke the stream.
        self.check_usable()?;
        let Channel { writer, reader } = &mut *channel;

        let writer = writer.as_mut().ok_or_else(|| McpError::SessionClosed {
            server: self.server_name.clone(),
        })?;
        if let Err(e) = writer.write_all(json.as_bytes()).await {
            return Err(self.mark_broken(&format!("failed to write to stdin: {e}")));
        }
        if let Err(e) = writer.flush().await {
            return Err(self.mark_broken(&format!("failed to flush stdin: {e}")));
        }

        tracing::debug!(server = %self.server_name, id, method, "request sent");

        let mut line_buf = Vec::new();
        loop {
            line_buf.clear();
            let bytes_read = match reader.read_until(b'\n', &mut line_buf).await {
                Ok(n) => n,
                Err(e) => {
                    return Err(self.mark_broken(&format!("failed to read from stdout: {e}")))
                }
            };

            if bytes_read == 0 {
                return Err(
                    self.mark_broken("server stdout closed (process may have exited)")
                );
            }

            if line_buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // Undecodable bytes are server noise like any other non-JSON line.
            match serde_json::from_slice::<JsonRpcResponse>(&line_buf) {
                Ok(resp) if resp.id == id => return Ok(resp),
                Ok(resp) => {
                    tracing::debug!(
                        server = %self.server_name,
                        expected = id,
                        got = resp.id,
                        "skipping response for another request"
                    );
                }
                Err(_) => {
                    tracing::trace!(
                        server = %self.server_name,
                        line = %String::from_utf8_lossy(&line_buf).trim_end(),
                        "skipping non-response line"
                    );
                }
            }
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        self.check_usable()?;

        let mut notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        if let Some(params) = params {
            notification["params"] = params;
        }

        let mut json = serde_json::to_string(&notification).map_err(|e| {
            McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("failed to serialize notification: {e}"),
            }
        })?;
        json.push('\n');

        let mut channel = self.channel.lock().await;
        let writer = channel.writer.as_mut().ok_or_else(|| McpError::SessionClosed {
            server: self.server_name.clone(),
        })?;
        if let Err(e) = writer.write_all(json.as_bytes()).await {
            return Err(self.mark_broken(&format!("failed to write notification: {e}")));
        }
        if let Err(e) = writer.flush().await {
            return Err(self.mark_broken(&format!("failed to flush notification: {e}")));
        }

        Ok(())
    }

    /// Close the request stream. The server sees EOF on stdin.
    ///
    /// Waits for any in-flight request to release the stream pair first.
    pub async fn close_writer(&self) {
        let mut channel = self.channel.lock().await;
        if let Some(mut writer) = channel.writer.take() {
            let _ = writer.shutdown().await;
        }
    }
}

// ─── Response Helpers ────────────────────────────────────────────────────────

/// Extract the result from a JSON-RPC response, converting errors to `McpError`.
pub fn extract_result(response: JsonRpcResponse) -> Result<serde_json::Value, McpError> {
    if let Some(err) = response.error {
        return Err(McpError::ServerError {
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }

    response.result.ok_or(McpError::ServerError {
        code: -32603,
        message: "response missing both result and error".into(),
        data: None,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
