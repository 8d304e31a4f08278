//! toolbridge service entrypoint.

use std::sync::Arc;

use anyhow::Context;
use toolbridge::agent_core::Orchestrator;
use toolbridge::config::AppConfig;
use toolbridge::inference::AnthropicClient;
use toolbridge::mcp_client::McpClient;
use toolbridge::service::{self, AppState, LifecycleManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    toolbridge::logging::init_tracing(&config.logging).context("initializing logging")?;

    let addr = config.server.socket_addr()?;
    let gateway = Arc::new(AnthropicClient::new(config.completion.clone())?);
    tracing::info!(model = gateway.model(), "completion gateway ready");

    let lifecycle = LifecycleManager::new(config.tool_server.clone());
    let call_timeout_ms = config.tool_server.call_timeout_ms;

    let result = lifecycle
        .scope(|session| async move {
            let client = McpClient::new(session.clone()).with_call_timeout(call_timeout_ms);
            let orchestrator = Orchestrator::new(Arc::new(client), gateway);
            let state = AppState {
                orchestrator,
                session,
            };
            service::serve(addr, state, shutdown_signal()).await
        })
        .await;

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "toolbridge exiting with error");
    } else {
        tracing::info!("toolbridge stopped");
    }
    result
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
