//! Plugin options and the last-changed timestamp derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored plugin option as the platform reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginOption {
    pub name: String,
    pub value: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub updated: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

/// Active plugin options, with the time the most recent one changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOptions {
    values: BTreeMap<String, String>,
    last_changed: Option<DateTime<Utc>>,
}

impl PluginOptions {
    /// Keep the active options and track the latest update time among them.
    pub fn from_options<'a>(options: impl IntoIterator<Item = &'a PluginOption>) -> Self {
        let mut values = BTreeMap::new();
        let mut last_changed: Option<DateTime<Utc>> = None;

        for option in options.into_iter().filter(|o| o.active) {
            values.insert(option.name.clone(), option.value.clone());
            last_changed = Some(match last_changed {
                Some(current) => current.max(option.updated),
                None => option.updated,
            });
        }

        Self {
            values,
            last_changed,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether a yes/no option is switched on.
    pub fn is_enabled(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("yes" | "true" | "1")
        )
    }

    /// A positive integer option, or `default` when missing or malformed.
    pub fn dimension(&self, name: &str, default: u32) -> u32 {
        self.get(name)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default)
    }

    pub fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.last_changed
    }

    /// Cache-busting stamp: microseconds since the epoch of the latest
    /// active option change, or 0 when no option is active.
    pub fn last_changed_stamp(&self) -> i64 {
        self.last_changed.map_or(0, |t| t.timestamp_micros())
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}
