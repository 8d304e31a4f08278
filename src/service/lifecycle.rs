//! Session lifecycle for the service's run duration.
//!
//! The [`LifecycleManager`] is the only owner that ever closes the tool
//! session. Everything else holds an `Arc<Session>` and treats it as borrowed.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Mutex;

use crate::agent_core::AgentError;
use crate::mcp_client::{Session, ToolServerConfig};

/// Starts, hands out, and shuts down the single tool session.
pub struct LifecycleManager {
    config: ToolServerConfig,
    session: Mutex<Option<Arc<Session>>>,
}

impl LifecycleManager {
    pub fn new(config: ToolServerConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Spawn the tool server and complete the handshake.
    ///
    /// If the handshake fails the half-started process is closed before the
    /// error is returned, so no child outlives a failed startup.
    pub async fn on_startup(&self) -> Result<Arc<Session>, AgentError> {
        let mut slot = self.session.lock().await;
        if let Some(existing) = slot.as_ref() {
            return Ok(existing.clone());
        }

        tracing::info!(
            server = %self.config.name,
            script = %self.config.script,
            "starting tool server"
        );
        let session = Session::start(&self.config).await?;

        match session.initialize().await {
            Ok(info) => {
                tracing::info!(
                    server = %self.config.name,
                    remote = info.name.as_deref().unwrap_or("unknown"),
                    remote_version = info.version.as_deref().unwrap_or("unknown"),
                    "tool session ready"
                );
            }
            Err(e) => {
                tracing::error!(server = %self.config.name, error = %e, "tool session handshake failed");
                session.close().await;
                return Err(e.into());
            }
        }

        let session = Arc::new(session);
        *slot = Some(session.clone());
        Ok(session)
    }

    /// Close the session if one was started. Safe to call any number of times.
    pub async fn on_shutdown(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            tracing::info!(server = %session.name(), "shutting down tool session");
            session.close().await;
        }
    }

    /// The live session, if started.
    pub async fn session(&self) -> Option<Arc<Session>> {
        self.session.lock().await.clone()
    }

    /// Run `f` with a started session, shutting down on every exit path.
    ///
    /// A startup error is returned without calling `f`. A panic inside `f`
    /// resumes after shutdown has run.
    pub async fn scope<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AgentError>,
    {
        let session = match self.on_startup().await {
            Ok(session) => session,
            Err(e) => {
                self.on_shutdown().await;
                return Err(e.into());
            }
        };

        let outcome = AssertUnwindSafe(f(session)).catch_unwind().await;
        self.on_shutdown().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Write;

    use super::*;

    /// A minimal MCP server in sh: answers `initialize`, ignores the rest.
    const HANDSHAKE_SERVER: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *'"initialize"'*)
      id=$(printf '%s' "$line" | sed 's/.*"id":\([0-9]*\).*/\1/')
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"sh","version":"0"}}}\n' "$id"
      ;;
  esac
done
"#;

    fn shell_config(body: &str) -> (tempfile::NamedTempFile, ToolServerConfig) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{body}").unwrap();
        let mut config = ToolServerConfig::for_script(file.path().to_string_lossy());
        config.command = Some("sh".into());
        config.init_timeout_ms = 2_000;
        (file, config)
    }

    #[tokio::test]
    async fn startup_with_missing_script_is_process_launch_error() {
        let manager =
            LifecycleManager::new(ToolServerConfig::for_script("/no/such/dir/mcp_server.py"));
        let err = manager.on_startup().await.unwrap_err();
        assert!(matches!(err, AgentError::ProcessLaunch { .. }), "got {err:?}");
        assert!(manager.session().await.is_none());
    }

    #[tokio::test]
    async fn failed_handshake_leaves_no_session() {
        let (_file, mut config) = shell_config("cat > /dev/null");
        config.init_timeout_ms = 200;
        let manager = LifecycleManager::new(config);
        let err = manager.on_startup().await.unwrap_err();
        assert!(matches!(err, AgentError::Protocol { .. }), "got {err:?}");
        assert!(manager.session().await.is_none());
    }

    #[tokio::test]
    async fn startup_then_shutdown_twice() {
        let (_file, config) = shell_config(HANDSHAKE_SERVER);
        let manager = LifecycleManager::new(config);
        let session = manager.on_startup().await.unwrap();
        assert!(session.status().initialized);

        manager.on_shutdown().await;
        manager.on_shutdown().await;
        assert!(session.status().closed);
        assert!(manager.session().await.is_none());
    }

    #[tokio::test]
    async fn scope_closes_after_error() {
        let (_file, config) = shell_config(HANDSHAKE_SERVER);
        let manager = LifecycleManager::new(config);
        let mut seen = None;

        let result: Result<(), AgentError> = manager
            .scope(|session| {
                seen = Some(session.clone());
                async move {
                    Err(AgentError::Config {
                        reason: "boom".into(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert!(seen.unwrap().status().closed);
    }

    #[tokio::test]
    async fn scope_closes_after_panic() {
        let (_file, config) = shell_config(HANDSHAKE_SERVER);
        let manager = Arc::new(LifecycleManager::new(config));
        let seen: Arc<std::sync::Mutex<Option<Arc<Session>>>> = Default::default();

        let task = {
            let manager = manager.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                manager
                    .scope(|session| {
                        *seen.lock().unwrap() = Some(session);
                        async move {
                            if true {
                                panic!("handler blew up");
                            }
                            Ok::<(), AgentError>(())
                        }
                    })
                    .await
            })
        };

        let join = task.await;
        assert!(join.unwrap_err().is_panic());
        let session = seen.lock().unwrap().clone().unwrap();
        assert!(session.status().closed);
    }

    #[tokio::test]
    async fn scope_skips_body_when_startup_fails() {
        let manager =
            LifecycleManager::new(ToolServerConfig::for_script("/no/such/dir/mcp_server.py"));
        let mut ran = false;
        let result: Result<(), AgentError> = manager
            .scope(|_| {
                ran = true;
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(AgentError::ProcessLaunch { .. })));
        assert!(!ran);
    }
}
