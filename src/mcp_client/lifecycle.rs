//! Server process lifecycle management.
//!
//! A [`Session`] owns the MCP server child process and the JSON-RPC transport
//! over its stdio. Lifecycle: `start` → `initialize` → requests → `close`.
//! A closed session is never reused; reconnecting means starting a new one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::errors::McpError;
use super::transport::{extract_result, StdioTransport};
use super::types::{InitializeResult, ServerInfo, ToolServerConfig, PROTOCOL_VERSION};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Timeout for graceful shutdown before force-killing.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `close` waits for an in-flight request to release the stream pair.
const WRITER_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ─── Session ─────────────────────────────────────────────────────────────────

/// A running MCP server process with its transport.
pub struct Session {
    /// Human-readable server name (e.g., "mail").
    name: String,
    /// The child process handle. `None` once closed.
    process: Mutex<Option<Child>>,
    /// JSON-RPC transport (stdin/stdout).
    transport: StdioTransport,
    initialized: AtomicBool,
    closed: AtomicBool,
    init_timeout: Duration,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a session's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SessionStatus {
    pub initialized: bool,
    pub broken: bool,
    pub closed: bool,
}

impl Session {
    /// Spawn the server process described by `config`.
    ///
    /// The script path is resolved to an absolute path first so the child's
    /// working directory cannot change what gets launched. Fails with
    /// `SpawnFailed` if the script does not exist or the spawn fails.
    pub async fn start(config: &ToolServerConfig) -> Result<Self, McpError> {
        let name = config.name.as_str();
        let script = resolve_script_path(name, &config.script)?;

        let mut cmd = match &config.command {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.args(&config.args).arg(&script);
                cmd
            }
            None => {
                let mut cmd = Command::new(&script);
                cmd.args(&config.args);
                cmd
            }
        };

        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &config.cwd {
            cmd.current_dir(dir);
        }

        // Windows: prevent console window from appearing for child processes
        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        // Wire stdio for JSON-RPC
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            name: name.to_string(),
            reason: format!("{}: {e}", script.display()),
        })?;

        let stdin = child.stdin.take().ok_or(McpError::SpawnFailed {
            name: name.to_string(),
            reason: "failed to capture stdin".into(),
        })?;

        let stdout = child.stdout.take().ok_or(McpError::SpawnFailed {
            name: name.to_string(),
            reason: "failed to capture stdout".into(),
        })?;

        if let Some(stderr) = child.stderr.take() {
            forward_stderr(name.to_string(), stderr);
        }

        tracing::info!(
            server = name,
            script = %script.display(),
            pid = child.id(),
            "tool server process started"
        );

        Ok(Self {
            name: name.to_string(),
            process: Mutex::new(Some(child)),
            transport: StdioTransport::new(name, stdin, stdout),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            init_timeout: Duration::from_millis(config.init_timeout_ms),
        })
    }

    /// Server name from the config.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            initialized: self.initialized.load(Ordering::Acquire),
            broken: self.transport.broken_reason().is_some(),
            closed: self.closed.load(Ordering::Acquire),
        }
    }

    /// Perform the MCP initialization handshake.
    ///
    /// Sends `initialize`, validates the reply, then sends the
    /// `notifications/initialized` notification. Must complete before any
    /// other request. Bounded by the configured init timeout.
    pub async fn initialize(&self) -> Result<ServerInfo, McpError> {
        self.ensure_open()?;

        let handshake = async {
            let params = serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            });
            let response = self.transport.request("initialize", Some(params)).await?;
            let result = extract_result(response)?;
            let init: InitializeResult =
                serde_json::from_value(result).map_err(|e| McpError::InitFailed {
                    name: self.name.clone(),
                    reason: format!("failed to parse initialize response: {e}"),
                })?;
            self.transport
                .notify("notifications/initialized", None)
                .await?;
            Ok::<_, McpError>(init)
        };

        let init = match tokio::time::timeout(self.init_timeout, handshake).await {
            Ok(Ok(init)) => init,
            Ok(Err(McpError::InitFailed { name, reason })) => {
                return Err(McpError::InitFailed { name, reason })
            }
            Ok(Err(e)) => {
                return Err(McpError::InitFailed {
                    name: self.name.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(McpError::InitFailed {
                    name: self.name.clone(),
                    reason: format!(
                        "initialization timed out after {}ms",
                        self.init_timeout.as_millis()
                    ),
                })
            }
        };

        self.initialized.store(true, Ordering::Release);

        let info = init.server_info.unwrap_or_default();
        tracing::info!(
            server = %self.name,
            protocol_version = %init.protocol_version,
            server_name = info.name.as_deref().unwrap_or("unknown"),
            server_version = info.version.as_deref().unwrap_or("unknown"),
            "session initialized"
        );
        Ok(info)
    }

    /// Send a request and return its `result` payload.
    ///
    /// Fails with `NotInitialized` before the handshake and `SessionClosed`
    /// after `close`.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        self.ensure_open()?;
        if !self.initialized.load(Ordering::Acquire) {
            return Err(McpError::NotInitialized {
                server: self.name.clone(),
            });
        }
        let response = self.transport.request(method, params).await?;
        extract_result(response)
    }

    fn ensure_open(&self) -> Result<(), McpError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(McpError::SessionClosed {
                server: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Shut the server down: close stdin, wait for exit, force-kill on timeout.
    ///
    /// Idempotent and infallible. Safe to call after a failed `initialize`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // A hung tool call can hold the stream pair; don't wait on it forever.
        if tokio::time::timeout(WRITER_CLOSE_TIMEOUT, self.transport.close_writer())
            .await
            .is_err()
        {
            tracing::warn!(server = %self.name, "stdin busy at close; killing");
        }

        let Some(mut child) = self.process.lock().await.take() else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(server = %self.name, %status, "tool server exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(server = %self.name, error = %e, "wait failed; killing");
                let _ = child.kill().await;
            }
            Err(_) => {
                tracing::warn!(
                    server = %self.name,
                    timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                    "tool server did not exit; killing"
                );
                let _ = child.kill().await;
            }
        }
    }
}

/// Resolve `script` to an absolute path and check it exists.
fn resolve_script_path(name: &str, script: &str) -> Result<PathBuf, McpError> {
    let path = Path::new(script);
    let absolute = std::path::absolute(path).map_err(|e| McpError::SpawnFailed {
        name: name.to_string(),
        reason: format!("cannot resolve '{script}': {e}"),
    })?;

    if !absolute.exists() {
        return Err(McpError::SpawnFailed {
            name: name.to_string(),
            reason: format!("server script not found: {}", absolute.display()),
        });
    }
    Ok(absolute)
}

/// Relay the child's stderr into the log until it closes.
fn forward_stderr(name: String, stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        let mut reader = tokio::io::BufReader::new(stderr);
        let mut line = Vec::new();
        // Keep draining on undecodable output so the child never blocks on a
        // full pipe.
        while let Ok(n) = reader.read_until(b'\n', &mut line).await {
            if n == 0 {
                break;
            }
            tracing::debug!(server = %name, "stderr: {}", String::from_utf8_lossy(&line).trim_end());
            line.clear();
        }
    });
}

// ─── Tests ───────────────────────────────────────────────────────────────────
