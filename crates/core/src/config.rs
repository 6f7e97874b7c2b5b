//! Run configuration: tool enablement, timeouts, API keys and proxies.
//!
//! Loaded once from `config.json` at startup. A missing file falls back to
//! the built-in defaults; a malformed file is an error.

use crate::tool::{ToolName, CATALOG};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable that supplies the darksearch API key.
pub const DARKSEARCH_API_KEY_ENV: &str = "OSINTMASTER_DARKSEARCH_API_KEY";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config path
        path: String,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Per-tool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Whether the tool runs
    pub enabled: bool,

    /// Deadline in seconds (0 or absent = none)
    pub timeout: Option<u64>,

    /// API key for tools that need one
    pub api_key: String,

    /// Run inside a container instead of the local checkout
    pub docker_required: bool,
}

/// Proxy settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Whether proxies are used
    pub enabled: bool,

    /// Proxy URLs, handed out round-robin
    pub list: Vec<String>,
}

impl ProxyConfig {
    /// Proxy for the `index`-th dispatched tool.
    pub fn pick(&self, index: usize) -> Option<&str> {
        if !self.enabled || self.list.is_empty() {
            return None;
        }
        Some(self.list[index % self.list.len()].as_str())
    }
}

/// Immutable configuration for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Settings keyed by tool name
    #[serde(default)]
    pub tools: BTreeMap<String, ToolSettings>,

    /// Proxy settings
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        let tools = CATALOG
            .iter()
            .map(|d| {
                (
                    d.name.as_str().to_string(),
                    ToolSettings {
                        enabled: d.enabled_by_default,
                        timeout: d.default_timeout,
                        api_key: String::new(),
                        docker_required: d.docker_by_default,
                    },
                )
            })
            .collect();

        Self {
            tools,
            proxy: ProxyConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config {} not found, using built-in defaults", shown);
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path: shown, source }),
        };

        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: shown.clone(),
            source,
        })?;
        debug!("Loaded config from {}", shown);
        Ok(config)
    }

    /// Parse configuration from a JSON document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(text)?;
        // Tool names match case-insensitively; lookups use the lowercase key.
        config.tools = std::mem::take(&mut config.tools)
            .into_iter()
            .filter_map(|(key, settings)| match key.parse::<ToolName>() {
                Ok(tool) => Some((tool.as_str().to_string(), settings)),
                Err(_) => {
                    warn!("Ignoring unknown tool in config: {}", key);
                    None
                }
            })
            .collect();
        Ok(config)
    }

    /// Fill empty secrets from the environment.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(DARKSEARCH_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            let entry = self
                .tools
                .entry(ToolName::DarkSearch.as_str().to_string())
                .or_default();
            if entry.api_key.trim().is_empty() {
                entry.api_key = key;
            }
        }
        self
    }

    /// Settings for `tool`; defaults (disabled) when absent.
    pub fn settings(&self, tool: ToolName) -> ToolSettings {
        self.tools.get(tool.as_str()).cloned().unwrap_or_default()
    }

    /// Whether `tool` is enabled.
    pub fn is_enabled(&self, tool: ToolName) -> bool {
        self.tools.get(tool.as_str()).map(|s| s.enabled).unwrap_or(false)
    }

    /// Deadline for `tool`, if any.
    pub fn timeout(&self, tool: ToolName) -> Option<Duration> {
        self.tools
            .get(tool.as_str())
            .and_then(|s| s.timeout)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Enabled tools in catalog order.
    pub fn enabled_tools(&self) -> Vec<ToolName> {
        ToolName::ALL
            .into_iter()
            .filter(|t| self.is_enabled(*t))
            .collect()
    }
}
