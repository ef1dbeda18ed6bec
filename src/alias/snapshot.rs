//! A fetched copy of the remote alias table

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Alias entries as fetched from the remote table
///
/// Stores the key to base-URL mapping along with the time it was fetched.
#[derive(Debug, Clone)]
pub struct AliasSnapshot {
    entries: HashMap<String, String>,

    /// When the table was fetched
    pub fetched_at: DateTime<Utc>,
}

impl AliasSnapshot {
    /// Creates a snapshot stamped with the current time
    ///
    /// Values are trimmed of whitespace and trailing slashes; non-http values
    /// are dropped.
    pub fn new(entries: HashMap<String, String>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|(key, value)| {
                let value = normalize_base(&value)?;
                Some((key, value))
            })
            .collect();

        Self {
            entries,
            fetched_at: Utc::now(),
        }
    }

    /// Parses the remote JSON object, ignoring non-string values
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(body)?;
        let entries = raw
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(url) => Some((key, url)),
                _ => None,
            })
            .collect();
        Ok(Self::new(entries))
    }

    /// Looks up the live base URL of a logical host
    pub fn get(&self, logical_host: &str) -> Option<&str> {
        self.entries.get(logical_host).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trims a base URL and checks it is usable
pub(crate) fn normalize_base(value: &str) -> Option<String> {
    let value = value.trim().trim_end_matches('/');
    if value.starts_with("http://") || value.starts_with("https://") {
        Some(value.to_string())
    } else {
        None
    }
}
