//! Service shell: session lifecycle and the HTTP surface.
//!
//! - `lifecycle`: ordered startup/shutdown of the tool session
//! - `http`: axum router and handlers

pub mod http;
pub mod lifecycle;

pub use http::{build_router, serve, AppState};
pub use lifecycle::LifecycleManager;
