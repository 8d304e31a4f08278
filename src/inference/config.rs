//! Completion service configuration.
//!
//! Lives under the `completion:` key of `toolbridge.yaml`. Every field has a
//! default except the API key, which is usually interpolated from
//! `${ANTHROPIC_API_KEY}`.

use serde::Deserialize;

use super::errors::InferenceError;

/// Connection and request settings for the completion service.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Service root; requests go to `{base_url}/v1/messages`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sent as the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Hard bound on a whole completion call, connect to last byte.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_api_version() -> String {
    "2023-06-01".to_string()
}
fn default_timeout_ms() -> u64 {
    35_000
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl CompletionConfig {
    /// Full URL of the messages endpoint.
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    /// Reject configs that cannot produce a working client.
    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.api_key.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "completion API key is empty (set ANTHROPIC_API_KEY)".into(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "completion model is empty".into(),
            });
        }
        if self.max_tokens == 0 {
            return Err(InferenceError::ConfigError {
                reason: "max_tokens must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: CompletionConfig = serde_yaml::from_str("api_key: sk-test").unwrap();
        assert_eq!(config.timeout_ms, 35_000);
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.api_version, "2023-06-01");
        assert_eq!(config.messages_url(), "https://api.anthropic.com/v1/messages");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_messages_url_trims_trailing_slash() {
        let config = CompletionConfig {
            base_url: "http://127.0.0.1:9999/".into(),
            ..CompletionConfig::default()
        };
        assert_eq!(config.messages_url(), "http://127.0.0.1:9999/v1/messages");
    }

    #[test]
    fn test_validate_requires_api_key() {
        let err = CompletionConfig::default().validate().unwrap_err();
        assert!(matches!(err, InferenceError::ConfigError { .. }));
    }
}
