//! Service configuration.
//!
//! Loaded from `toolbridge.yaml`, found via `TOOLBRIDGE_CONFIG` or by walking
//! up from the working directory. String values may use `${VAR}` or
//! `${VAR:-default}`; defaults get `~` expanded. Without a file, everything
//! comes from defaults plus a few environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::inference::CompletionConfig;
use crate::mcp_client::ToolServerConfig;

/// File name searched for when `TOOLBRIDGE_CONFIG` is not set.
pub const CONFIG_FILE_NAME: &str = "toolbridge.yaml";

/// Name of the bundled email tool server binary.
const MAIL_SERVER_BIN: &str = "toolbridge-mail";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

// ─── Types ───────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_tool_server")]
    pub tool_server: ToolServerConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                reason: format!("bad listen address {}:{}: {e}", self.host, self.port),
            })
    }
}

/// Log output settings. `RUST_LOG`, when set, overrides `filter`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Write to `<directory>/toolbridge.log` instead of stderr.
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9001
}

fn default_tool_server() -> ToolServerConfig {
    ToolServerConfig::for_script(default_mail_server_path())
}

/// The mail server binary next to the running executable, if present.
fn default_mail_server_path() -> String {
    let exe_name = format!("{MAIL_SERVER_BIN}{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&exe_name)))
        .filter(|candidate| candidate.exists())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or(exe_name)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tool_server: default_tool_server(),
            completion: CompletionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load from the discovered config file, or from the environment when
    /// there is none.
    pub fn load() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::Read {
            path: ".".into(),
            reason: e.to_string(),
        })?;
        match find_config_path(&cwd)? {
            Some(path) => load_config(&path),
            None => Ok(Self::from_env()),
        }
    }

    /// Defaults overlaid with `ANTHROPIC_API_KEY`, `MODEL`,
    /// `TOOL_SERVER_SCRIPT` and `TOOL_SERVER_COMMAND`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.completion.api_key = key;
        }
        if let Ok(model) = std::env::var("MODEL") {
            if !model.trim().is_empty() {
                config.completion.model = model;
            }
        }
        if let Ok(script) = std::env::var("TOOL_SERVER_SCRIPT") {
            config.tool_server.script = expand_tilde(&script);
        }
        if let Ok(command) = std::env::var("TOOL_SERVER_COMMAND") {
            if !command.trim().is_empty() {
                config.tool_server.command = Some(command);
            }
        }
        config
    }
}

/// Locate the config file.
///
/// `TOOLBRIDGE_CONFIG` wins when set and must name an existing file;
/// otherwise walks up from `start` looking for `toolbridge.yaml`.
pub fn find_config_path(start: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let explicit = std::env::var("TOOLBRIDGE_CONFIG").ok();
    locate_config(explicit.as_deref(), start)
}

fn locate_config(explicit: Option<&str>, start: &Path) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(explicit) = explicit.filter(|p| !p.trim().is_empty()) {
        let candidate = PathBuf::from(expand_tilde(explicit));
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        return Err(ConfigError::Read {
            path: candidate.display().to_string(),
            reason: "TOOLBRIDGE_CONFIG does not name a file".into(),
        });
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        if !dir.pop() {
            return Ok(None);
        }
    }
}

/// Read, interpolate and parse a config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_config(&raw).map_err(|reason| ConfigError::Parse {
        path: path.display().to_string(),
        reason,
    })
}

fn parse_config(raw: &str) -> Result<AppConfig, String> {
    let interpolated = interpolate_env_vars(raw);
    serde_yaml::from_str(&interpolated).map_err(|e| e.to_string())
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve `VAR` or `VAR:-default`. Empty variables count as unset.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| expand_tilde(default)),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__TOOLBRIDGE_UNSET_VAR__");
        let result = interpolate_env_vars("${__TOOLBRIDGE_UNSET_VAR__:-/fallback/path}");
        assert_eq!(result, "/fallback/path");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__TOOLBRIDGE_SET_VAR__", "/custom/path");
        let result = interpolate_env_vars("dir: ${__TOOLBRIDGE_SET_VAR__:-/fallback}");
        assert_eq!(result, "dir: /custom/path");
        std::env::remove_var("__TOOLBRIDGE_SET_VAR__");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "plain text with $dollar but no braces";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/outbox.jsonl");
        assert!(!result.starts_with('~'));
        assert!(result.ends_with("/outbox.jsonl"));
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  host: 127.0.0.1
  port: 9100
tool_server:
  name: mail
  command: python
  script: ./mcp_server.py
  env:
    CONTACTS_PATH: /tmp/contacts.json
  call_timeout_ms: 5000
completion:
  api_key: sk-test
  model: claude-3-5-haiku-latest
logging:
  json: true
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.server.socket_addr().unwrap().port(), 9100);
        assert_eq!(config.tool_server.name, "mail");
        assert_eq!(config.tool_server.command.as_deref(), Some("python"));
        assert_eq!(config.tool_server.init_timeout_ms, 30_000);
        assert_eq!(config.tool_server.call_timeout_ms, 5_000);
        assert_eq!(config.completion.model, "claude-3-5-haiku-latest");
        assert_eq!(config.completion.timeout_ms, 35_000);
        assert!(config.logging.json);
    }

    #[test]
    fn test_parse_empty_sections_use_defaults() {
        let config = parse_config("completion:\n  api_key: k\n").unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.tool_server.script.contains(MAIL_SERVER_BIN));
        assert!(!config.logging.json);
    }

    #[test]
    fn test_find_config_path_walks_up() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), "{}").unwrap();

        let found = locate_config(None, &nested).unwrap();
        assert_eq!(found, Some(root.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        let explicit = root.path().join("other.yaml");
        std::fs::write(&explicit, "{}").unwrap();

        let found = locate_config(Some(&explicit.display().to_string()), root.path()).unwrap();
        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        let missing = root.path().join("missing.yaml");

        match locate_config(Some(&missing.display().to_string()), root.path()) {
            Err(ConfigError::Read { path, reason }) => {
                assert!(path.ends_with("missing.yaml"));
                assert!(reason.contains("TOOLBRIDGE_CONFIG"));
            }
            other => panic!("expected Read error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_config_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "server: [not, a, map]").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }
}
