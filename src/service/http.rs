//! HTTP front-end: `/chat`, `/tools`, `/health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::agent_core::{AgentError, Orchestrator};
use crate::mcp_client::{Session, ToolDescriptor};

// ─── State ──────────────────────────────────────────────────────────────────

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Non-owning handle, used only for status reporting.
    pub session: Arc<Session>,
}

// ─── Bodies ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    session: crate::mcp_client::SessionStatus,
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Error response body: `{"detail": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiErrorBody { detail: self.detail })).into_response()
    }
}

/// Pipeline failures are all server-side from the caller's point of view.
impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self::internal(err.to_string())
    }
}

// ─── Router ─────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/tools", get(tools_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<S>(addr: SocketAddr, state: AppState, shutdown: S) -> anyhow::Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("toolbridge listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    let response = state.orchestrator.run(&req.message).await?;
    Ok(Json(ChatResponse { response }))
}

async fn tools_handler(State(state): State<AppState>) -> Result<Json<ToolsResponse>, ApiError> {
    let tools = state.orchestrator.list_tools().await?;
    Ok(Json(ToolsResponse { tools }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.status();
    let status = if session.initialized && !session.broken && !session.closed {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status, session })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
