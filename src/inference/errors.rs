//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur during completion-service calls.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the completion endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The endpoint did not answer within the configured timeout.
    #[error("completion request timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    /// Non-2xx HTTP response from the completion endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// A constrained tool-choice call came back without any `tool_use` block.
    #[error("completion service returned no tool selection (stop_reason: {})", stop_reason.as_deref().unwrap_or("unknown"))]
    NoToolUse {
        stop_reason: Option<String>,
    },

    /// A free-form call came back without any text block.
    #[error("completion service returned no text content")]
    MissingText,

    /// The response body could not be decoded.
    #[error("invalid completion response: {reason}")]
    InvalidResponse {
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl InferenceError {
    /// Whether the service could not be reached or refused the request, as
    /// opposed to answering with unusable content.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            InferenceError::ConnectionFailed { .. }
                | InferenceError::Timeout { .. }
                | InferenceError::HttpError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unavailable() {
        assert!(InferenceError::Timeout { duration_ms: 35_000 }.is_unavailable());
        assert!(InferenceError::HttpError {
            status: 529,
            body: "overloaded".into()
        }
        .is_unavailable());
        assert!(!InferenceError::NoToolUse { stop_reason: None }.is_unavailable());
        assert!(!InferenceError::MissingText.is_unavailable());
    }

    #[test]
    fn test_no_tool_use_message() {
        let err = InferenceError::NoToolUse {
            stop_reason: Some("end_turn".into()),
        };
        assert_eq!(
            err.to_string(),
            "completion service returned no tool selection (stop_reason: end_turn)"
        );
    }
}
