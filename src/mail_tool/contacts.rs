//! Contact directory: symbolic name → email address.

use std::collections::HashMap;
use std::path::Path;

use super::MailError;

/// Case-insensitive name lookup over a JSON object of `name: address`.
#[derive(Debug, Clone, Default)]
pub struct ContactDirectory {
    entries: HashMap<String, String>,
}

impl ContactDirectory {
    /// Load a JSON file such as `{"alice": "alice@example.com"}`.
    pub fn load(path: &Path) -> Result<Self, MailError> {
        let raw = std::fs::read_to_string(path).map_err(|e| MailError::ContactsUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let entries: HashMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| MailError::ContactsUnavailable {
                path: path.display().to_string(),
                reason: format!("expected a JSON object of name to address: {e}"),
            })?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Resolve one name.
    pub fn resolve(&self, name: &str) -> Result<String, MailError> {
        self.entries
            .get(&name.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| MailError::AddressNotFound {
                name: name.to_string(),
            })
    }

    /// Resolve every name, failing on the first unknown one.
    pub fn resolve_all(&self, names: &[String]) -> Result<Vec<String>, MailError> {
        names.iter().map(|n| self.resolve(n)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
