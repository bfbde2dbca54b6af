//! modkit - module registry and lifecycle manager
//!
//! Plugin-style applications are assembled from independently implemented
//! modules (format loaders, screens, engines, configuration stores). Each
//! module declares a category, the categories it requires, and a priority.
//! The registry owns every module, resolves required categories to their
//! default providers, computes a deterministic activation order, and runs
//! the enable/disable hooks in that order.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use modkit::module::{EventManager, ExecuteModule, ModuleContext, ModuleManager};
//!
//! # async fn start() -> Result<(), modkit::module::RegistryError> {
//! let manager = ModuleManager::new();
//! manager.register(Arc::new(ExecuteModule::new())).await?;
//! manager.register(Arc::new(EventManager::new())).await?;
//!
//! let ctx = ModuleContext::new();
//! manager.enable_all(&ctx).await?;
//! assert_eq!(manager.load_order().await, vec!["event-module", "execute-module"]);
//!
//! let report = manager.disable_all(&ctx).await;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{AppConfig, LoggingConfig, ModulesConfig};
pub use module::{Module, ModuleContext, ModuleError, ModuleManager, RegistryError};
