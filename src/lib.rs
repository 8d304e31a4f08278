//! toolbridge: answers chat messages by planning and running a single tool
//! call against an MCP stdio server.
//!
//! - `mcp_client`: tool server session, discovery and invocation
//! - `inference`: completion gateway (Anthropic Messages API)
//! - `agent_core`: the per-request orchestrator
//! - `service`: session lifecycle and HTTP surface
//! - `mail_tool`: the bundled email tool server
//! - `config`, `logging`: ambient setup

pub mod agent_core;
pub mod config;
pub mod inference;
pub mod logging;
pub mod mail_tool;
pub mod mcp_client;
pub mod service;
