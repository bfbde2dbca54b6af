//! Configuration management for the modkit host
//!
//! Handles configuration loading (JSON or TOML) and validation.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modkit::module=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Module system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// File backing the settings module
    #[serde(default = "default_settings_path")]
    pub settings_path: String,

    /// Execution profile handed to the execute module
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Seconds between execute-module heartbeats
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Bound on the whole enable pass; unbounded when absent
    #[serde(default)]
    pub enable_timeout_secs: Option<u64>,

    /// Module name -> resource location
    #[serde(default)]
    pub resource_paths: HashMap<String, String>,
}

fn default_settings_path() -> String {
    "data/settings.json".to_string()
}

fn default_profile() -> String {
    "all".to_string()
}

fn default_heartbeat_secs() -> u64 {
    5
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            profile: default_profile(),
            heartbeat_secs: default_heartbeat_secs(),
            enable_timeout_secs: None,
            resource_paths: HashMap::new(),
        }
    }
}

impl ModulesConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn enable_timeout(&self) -> Option<Duration> {
        self.enable_timeout_secs.map(Duration::from_secs)
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    #[serde(default)]
    pub modules: ModulesConfig,
}

impl AppConfig {
    /// Load configuration, choosing TOML for `.toml` files and JSON otherwise
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            Self::from_toml_file(path)
        } else {
            Self::from_json_file(path)
        }
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON config {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing TOML config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let modules = &self.modules;

        if modules.profile.is_empty() {
            return Err(anyhow::anyhow!("modules.profile must not be empty"));
        }

        if modules.heartbeat_secs == 0 {
            return Err(anyhow::anyhow!(
                "modules.heartbeat_secs must be greater than 0"
            ));
        }

        if modules.settings_path.is_empty() {
            return Err(anyhow::anyhow!("modules.settings_path must not be empty"));
        }

        if modules.resource_paths.keys().any(|name| name.is_empty()) {
            return Err(anyhow::anyhow!(
                "modules.resource_paths keys must be non-empty module names"
            ));
        }

        Ok(())
    }
}
