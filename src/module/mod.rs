//! Module system
//!
//! Independently implemented units register with a [`ModuleManager`], which
//! resolves their category-level dependencies into an activation order and
//! drives their lifecycle.
//!
//! ## Architecture
//!
//! - **Contract**: every unit implements [`Module`] (identity, category, dependencies, priority, hooks)
//! - **Default provider**: a required category resolves to its highest-priority module, ties broken by name
//! - **Ordering**: wave-based topological sort; providers always activate before their dependents
//! - **Lifecycle**: enable in order, stop at the first failure; disable in reverse, best effort
//! - **Isolation**: hooks run outside the registry lock and see the registry only through [`ModuleLookup`]

pub mod api;
pub mod base;
pub mod context;
pub mod lookup;
pub mod manager;
pub mod registry;
pub mod traits;

pub use api::{EventManager, ExecuteModule, SettingsStore};
pub use base::BaseModule;
pub use context::ModuleContext;
pub use lookup::ModuleLookup;
pub use manager::{ModuleManager, ShutdownReport};
pub use registry::{DependencyResolution, LifecycleOperation, RegistryError};
pub use traits::{EventModule, Module, ModuleError, ModuleMetadata, ModuleState, SettingsModule};
