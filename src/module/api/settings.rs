//! Persisted settings store
//!
//! String-keyed settings held in memory as a JSON object and persisted to a
//! single JSON file. Values are arbitrary JSON; the typed accessors on
//! [`SettingsModule`] convert on read.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::module::base::BaseModule;
use crate::module::context::ModuleContext;
use crate::module::traits::{Module, ModuleError, ModuleMetadata, SettingsModule};
use crate::utils::log_error_async;

/// Category served by [`SettingsStore`]
pub const SETTINGS_CATEGORY: &str = "settings";

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "data/settings.json";

/// Values seeded into a fresh settings file
pub fn default_settings() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("app.profile".into(), Value::from("all"));
    map.insert("ui.language".into(), Value::from("en"));
    map.insert("ui.theme".into(), Value::from("default"));
    map.insert("app.autoSave".into(), Value::from(true));
    map.insert("app.autoSaveDelay".into(), Value::from(30));
    map.insert("debug.enabled".into(), Value::from(false));
    map.insert("debug.logLevel".into(), Value::from("info"));
    map.insert("window.width".into(), Value::from(800));
    map.insert("window.height".into(), Value::from(600));
    map.insert("window.maximized".into(), Value::from(false));
    map
}

/// JSON-file backed settings module
pub struct SettingsStore {
    base: BaseModule,
    path: RwLock<PathBuf>,
    settings: RwLock<Map<String, Value>>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_PATH)
    }
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            base: BaseModule::new(SETTINGS_CATEGORY, "settings-module").with_priority(1500),
            path: RwLock::new(path.into()),
            settings: RwLock::new(Map::new()),
        }
    }

    /// Point the store at a different file; takes effect on the next load/save
    pub async fn set_settings_path(&self, path: impl Into<PathBuf>) {
        *self.path.write().await = path.into();
    }

    pub async fn settings_path(&self) -> PathBuf {
        self.path.read().await.clone()
    }

    /// All keys, sorted
    pub async fn list_settings(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.settings.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn setting_count(&self) -> usize {
        self.settings.read().await.len()
    }

    /// Drop every in-memory setting (the file is untouched until saved)
    pub async fn clear_settings(&self) {
        self.settings.write().await.clear();
    }

    async fn seed_defaults(&self) {
        let mut settings = self.settings.write().await;
        for (key, value) in default_settings() {
            settings.entry(key).or_insert(value);
        }
    }

    async fn read_file(path: &Path) -> Result<Map<String, Value>, ModuleError> {
        let contents = tokio::fs::read_to_string(path).await?;
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(ModuleError::Serialization(format!(
                "settings file {} must contain a JSON object, found {}",
                path.display(),
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl Module for SettingsStore {
    fn metadata(&self) -> &ModuleMetadata {
        self.base.metadata()
    }

    async fn enable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        match self.load_settings().await {
            Ok(()) => {}
            Err(ModuleError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "Settings file {} not found, seeding defaults",
                    self.settings_path().await.display()
                );
                self.seed_defaults().await;
                log_error_async(|| self.save_settings(), "Failed to save default settings").await;
            }
            Err(e) => return Err(e),
        }

        self.base.set_active(true);
        info!("Settings module enabled ({} settings)", self.setting_count().await);
        Ok(())
    }

    async fn disable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        log_error_async(|| self.save_settings(), "Failed to save settings on disable").await;
        self.base.set_active(false);
        info!("Settings module disabled");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.base.is_active()
    }

    fn as_settings_module(&self) -> Option<&dyn SettingsModule> {
        Some(self)
    }
}

#[async_trait]
impl SettingsModule for SettingsStore {
    async fn get_setting(&self, key: &str) -> Result<Value, ModuleError> {
        self.settings
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| ModuleError::SettingNotFound(key.to_string()))
    }

    async fn set_setting(&self, key: &str, value: Value) -> Result<(), ModuleError> {
        if key.is_empty() {
            return Err(ModuleError::InvalidArgument(
                "setting key cannot be empty".to_string(),
            ));
        }
        self.settings.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn load_settings(&self) -> Result<(), ModuleError> {
        let path = self.settings_path().await;
        let loaded = Self::read_file(&path).await?;
        debug!("Loaded {} settings from {}", loaded.len(), path.display());
        *self.settings.write().await = loaded;
        Ok(())
    }

    async fn save_settings(&self) -> Result<(), ModuleError> {
        let path = self.settings_path().await;
        let json = {
            let settings = self.settings.read().await;
            serde_json::to_string_pretty(&*settings)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&path, json).await?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }
}
