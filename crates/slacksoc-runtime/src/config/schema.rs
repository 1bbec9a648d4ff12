//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use slacksoc_framework::PluginConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlacksocConfig {
    /// API token, consumed by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Persisted plugin state.
    #[serde(default)]
    pub state: StateConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugins to load, in order.
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

/// Where plugin state is persisted and how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// JSON file holding the state table.
    #[serde(default = "default_state_file")]
    pub file: PathBuf,

    /// Debounce window between the first unsaved update and the flush.
    #[serde(default = "default_save_delay_secs")]
    pub save_delay_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            file: default_state_file(),
            save_delay_secs: default_save_delay_secs(),
        }
    }
}

impl StateConfig {
    pub fn save_delay(&self) -> Duration {
        Duration::from_secs(self.save_delay_secs)
    }
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.json")
}

fn default_save_delay_secs() -> u64 {
    5
}

/// One entry of the `plugins` list.
///
/// Every key other than `name` and `instance` is handed to the plugin as its
/// configuration:
///
/// ```yaml
/// plugins:
///   - name: Respond
///     instance: greetings
///     responses:
///       - trigger: "hi"
///         replies: ["hello!"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Registry key of the plugin.
    pub name: String,

    /// Instance name, defaults to `name`. Keys the instance's persisted state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    #[serde(flatten)]
    pub config: PluginConfig,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
            config: PluginConfig::new(),
        }
    }

    pub fn instance_name(&self) -> &str {
        self.instance.as_deref().unwrap_or(&self.name)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base level, overridden by `RUST_LOG`.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output` is `file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `slacksoc_framework: debug`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_plugin_entry_collects_config() {
        let entry: PluginEntry = serde_json::from_value(json!({
            "name": "Respond",
            "responses": [{"trigger": "hi", "replies": ["hello"]}],
        }))
        .unwrap();

        assert_eq!(entry.name, "Respond");
        assert_eq!(entry.instance_name(), "Respond");
        assert_eq!(entry.config.len(), 1);
        assert!(entry.config.contains_key("responses"));
    }

    #[test]
    fn test_plugin_entry_instance_name() {
        let entry: PluginEntry = serde_json::from_value(json!({
            "name": "Respond",
            "instance": "greetings",
        }))
        .unwrap();

        assert_eq!(entry.instance_name(), "greetings");
        assert!(entry.config.is_empty());
    }

    #[test]
    fn test_state_defaults() {
        let config = SlacksocConfig::default();
        assert_eq!(config.state.file, PathBuf::from("state.json"));
        assert_eq!(config.state.save_delay(), Duration::from_secs(5));
        assert_eq!(config.logging.level, LogLevel::Info);
    }
}
