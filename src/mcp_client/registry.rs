//! Tool registry: the tool set advertised by the connected MCP server.
//!
//! Provides:
//! - Tool lookup by name
//! - Order-preserving storage (server order is the order tools are shown to
//!   the completion service)
//! - Validation that a tool call matches the registered schema
//! - Near-miss suggestions for unknown tool names

use std::collections::HashMap;

use super::errors::McpError;
use super::schema;
use super::types::ToolDescriptor;

/// Max near-miss names attached to an `UnknownTool` error.
const MAX_SUGGESTIONS: usize = 3;

// ─── ToolRegistry ────────────────────────────────────────────────────────────

/// Tool descriptors in the order the server listed them.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    /// `tool_name → index into tools`.
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a freshly listed tool set.
    ///
    /// Names are unique within a session; if a server repeats one anyway the
    /// first entry wins and the duplicate is dropped.
    pub fn from_tools(tools: Vec<ToolDescriptor>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            if registry.index.contains_key(&tool.name) {
                tracing::warn!(tool = %tool.name, "duplicate tool name in listing; ignoring");
                continue;
            }
            registry.index.insert(tool.name.clone(), registry.tools.len());
            registry.tools.push(tool);
        }
        registry
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tools, in server order.
    pub fn all_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// All tool names, in server order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate a tool call: tool exists and arguments match its input schema.
    ///
    /// An unknown name carries the closest registered names as suggestions.
    pub fn validate_tool_call(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<(), McpError> {
        let def = self
            .get_tool(tool_name)
            .ok_or_else(|| McpError::UnknownTool {
                name: tool_name.to_string(),
                suggestions: self.find_similar(tool_name, MAX_SUGGESTIONS),
            })?;

        schema::validate(arguments, &def.input_schema).map_err(|reason| {
            McpError::InvalidArguments {
                tool: tool_name.to_string(),
                reason,
            }
        })
    }

    /// Find up to `max_results` tools most similar to `name`, best first.
    pub fn find_similar(&self, name: &str, max_results: usize) -> Vec<String> {
        let mut scored: Vec<(&str, f64)> = self
            .tools
            .iter()
            .map(|t| (t.name.as_str(), similarity(name, &t.name)))
            .filter(|(_, score)| *score > 0.3) // floor
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(max_results);
        scored.into_iter().map(|(name, _)| name.to_string()).collect()
    }
}

// ─── Edit Distance ──────────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    let m = a_bytes.len();
    let n = b_bytes.len();

    // Use single-row DP for O(min(m,n)) space
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_bytes[i - 1] != b_bytes[j - 1]);
            curr[j] = (prev[j] + 1)          // deletion
                .min(curr[j - 1] + 1)         // insertion
                .min(prev[j - 1] + cost);     // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Normalized similarity between two strings (0.0 = completely different, 1.0 = identical).
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    let dist = levenshtein(a, b);
    1.0 - (dist as f64 / max_len as f64)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
