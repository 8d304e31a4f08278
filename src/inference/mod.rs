//! Inference: the completion gateway.
//!
//! This module handles all communication with the external completion service:
//! - The [`CompletionGateway`] trait the orchestrator depends on
//! - An Anthropic Messages API implementation ([`AnthropicClient`])
//! - Constrained tool-choice planning and free-form answer calls
//! - Request/response wire types and prompt text
//!
//! The orchestrator only sees the trait, so the vendor is a config and
//! construction detail.

pub mod client;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod prompts;
pub mod types;

// Re-exports for convenience
pub use client::AnthropicClient;
pub use config::CompletionConfig;
pub use errors::InferenceError;
pub use gateway::CompletionGateway;
pub use types::{Plan, ToolCall, NO_TOOL};
