//! Module system traits and interfaces
//!
//! Defines the contract every module implements and the optional capability
//! traits (events, settings) that modules expose to one another.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::module::api::events::{Event, EventHandler, SubscriptionId};
use crate::module::context::ModuleContext;

/// Module lifecycle state as tracked by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Registered, never enabled
    Registered,
    /// Enable hook is running
    Enabling,
    /// Enable hook succeeded
    Active,
    /// Disable hook is running
    Disabling,
    /// Disabled; may be enabled again
    Inactive,
    /// Last lifecycle hook failed
    Failed(String),
}

/// Module metadata describing module identity and dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Module category (non-unique, e.g. "loader", "ui", "settings")
    pub category: String,
    /// Module name (unique identifier)
    pub name: String,
    /// Categories that must have an active provider before this module enables
    #[serde(default)]
    pub requires: Vec<String>,
    /// Categories this module looks up opportunistically at runtime
    #[serde(default)]
    pub uses: Vec<String>,
    /// Activation priority; higher activates earlier among peers
    #[serde(default)]
    pub priority: i32,
}

impl ModuleMetadata {
    /// Create metadata with no dependencies and priority 0
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            requires: Vec::new(),
            uses: Vec::new(),
            priority: 0,
        }
    }

    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_uses<I, S>(mut self, uses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uses = uses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Module trait that all modules must implement
///
/// Modules are shared by reference (`Arc<dyn Module>`) between the registry
/// and any module that looks them up, so lifecycle hooks take `&self` and
/// implementations keep their mutable state behind interior mutability.
#[async_trait]
pub trait Module: Send + Sync {
    /// Get module metadata
    fn metadata(&self) -> &ModuleMetadata;

    /// Activate the module
    ///
    /// Only called by the registry once every required category has an
    /// active provider. Long-running work must observe `ctx` cancellation.
    async fn enable(&self, ctx: &ModuleContext) -> Result<(), ModuleError>;

    /// Deactivate the module
    ///
    /// Must be safe to call after a partially failed enable.
    async fn disable(&self, ctx: &ModuleContext) -> Result<(), ModuleError>;

    /// Whether the module is currently enabled
    fn is_active(&self) -> bool;

    fn category(&self) -> &str {
        &self.metadata().category
    }

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn required_categories(&self) -> &[String] {
        &self.metadata().requires
    }

    /// Soft dependencies. Never affect activation order.
    fn used_categories(&self) -> &[String] {
        &self.metadata().uses
    }

    fn priority(&self) -> i32 {
        self.metadata().priority
    }

    /// Event capability, if this module provides one
    fn as_event_module(&self) -> Option<&dyn EventModule> {
        None
    }

    /// Settings capability, if this module provides one
    fn as_settings_module(&self) -> Option<&dyn SettingsModule> {
        None
    }
}

impl std::fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("category", &self.category())
            .field("name", &self.name())
            .field("priority", &self.priority())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Publish/subscribe capability over named, lazily-created topics
#[async_trait]
pub trait EventModule: Module {
    /// Create a topic, or return the existing one with the same name
    async fn create_event(&self, name: &str) -> Result<Arc<Event>, ModuleError>;

    /// Subscribe a handler to an existing topic
    async fn subscribe(
        &self,
        event_name: &str,
        handler: EventHandler,
    ) -> Result<SubscriptionId, ModuleError>;

    /// Remove a previously subscribed handler
    async fn unsubscribe(&self, event_name: &str, id: SubscriptionId) -> Result<(), ModuleError>;

    /// Trigger an existing topic, dispatching to handlers in subscription order
    async fn trigger(&self, event_name: &str, data: &Value) -> Result<(), ModuleError>;
}

/// Persisted string-keyed configuration capability
#[async_trait]
pub trait SettingsModule: Module {
    /// Get a raw setting value
    async fn get_setting(&self, key: &str) -> Result<Value, ModuleError>;

    /// Store a setting value (in memory until saved)
    async fn set_setting(&self, key: &str, value: Value) -> Result<(), ModuleError>;

    /// Replace in-memory settings with the persisted store
    async fn load_settings(&self) -> Result<(), ModuleError>;

    /// Persist in-memory settings
    async fn save_settings(&self) -> Result<(), ModuleError>;

    async fn get_string(&self, key: &str) -> Result<String, ModuleError> {
        match self.get_setting(key).await? {
            Value::String(s) => Ok(s),
            _ => Err(ModuleError::SettingTypeMismatch {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    async fn get_bool(&self, key: &str) -> Result<bool, ModuleError> {
        match self.get_setting(key).await? {
            Value::Bool(b) => Ok(b),
            _ => Err(ModuleError::SettingTypeMismatch {
                key: key.to_string(),
                expected: "boolean",
            }),
        }
    }

    /// Integer setting; integral floats (as produced by some JSON writers) are accepted
    async fn get_int(&self, key: &str) -> Result<i64, ModuleError> {
        let value = self.get_setting(key).await?;
        if let Some(i) = value.as_i64() {
            return Ok(i);
        }
        match value.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f as i64)
            }
            _ => Err(ModuleError::SettingTypeMismatch {
                key: key.to_string(),
                expected: "integer",
            }),
        }
    }

    async fn get_float(&self, key: &str) -> Result<f64, ModuleError> {
        self.get_setting(key)
            .await?
            .as_f64()
            .ok_or_else(|| ModuleError::SettingTypeMismatch {
                key: key.to_string(),
                expected: "number",
            })
    }

    /// Get a setting, falling back to `default` when it is missing
    async fn get_or(&self, key: &str, default: Value) -> Value {
        self.get_setting(key).await.unwrap_or(default)
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Module operation failed: {0}")]
    OperationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Event {0} does not exist")]
    EventNotFound(String),

    #[error("Subscription {id} not found for event {event}")]
    SubscriptionNotFound { event: String, id: SubscriptionId },

    #[error("Event handler failed for event {event}: {source}")]
    HandlerFailed {
        event: String,
        #[source]
        source: Box<ModuleError>,
    },

    #[error("Setting {0:?} not found")]
    SettingNotFound(String),

    #[error("Setting {key:?} is not a {expected}")]
    SettingTypeMismatch { key: String, expected: &'static str },

    #[error("{0} is already running")]
    AlreadyRunning(String),

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModuleError {
    /// Whether this is a cancellation-kind result (cancelled or past deadline)
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ModuleError::Cancelled | ModuleError::DeadlineExceeded)
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::Serialization(e.to_string())
    }
}
