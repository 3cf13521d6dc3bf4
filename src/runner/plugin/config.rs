//! Module system configuration file parsing.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::registry::BrokerError;

fn default_true() -> bool {
    true
}

fn default_native_modules() -> Vec<String> {
    vec!["objecttools".to_string()]
}

/// Per-context module system settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrokerConfig {
    /// Make top-level extension namespaces read-only once their trampolines are armed.
    #[serde(default = "default_true")]
    pub lock_namespaces: bool,
    /// Install the global `requireNative` function.
    #[serde(default = "default_true")]
    pub expose_require_native: bool,
    /// Built-in native modules registered in every new context.
    #[serde(default = "default_native_modules")]
    pub native_modules: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    broker: Option<BrokerConfig>,
}

impl BrokerConfig {
    pub fn new() -> Self {
        BrokerConfig {
            lock_namespaces: true,
            expose_require_native: true,
            native_modules: default_native_modules(),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// Expected format:
    /// ```toml
    /// [broker]
    /// lock_namespaces = true
    /// expose_require_native = true
    /// native_modules = ["objecttools"]
    /// ```
    pub fn load(path: &Path) -> Result<Self, BrokerError> {
        let content = fs::read_to_string(path).map_err(|e| {
            BrokerError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string. A missing `[broker]` table yields the
    /// defaults.
    pub fn parse(content: &str) -> Result<Self, BrokerError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| BrokerError::ConfigError(format!("Failed to parse config: {}", e)))?;
        Ok(file.broker.unwrap_or_default())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new()
    }
}
