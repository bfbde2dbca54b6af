//! Module registry internals
//!
//! Dependency resolution and the registry error taxonomy. The registry itself
//! lives in [`crate::module::manager`].

pub mod dependencies;
pub mod error;

pub use dependencies::{preference_order, DependencyResolution, ModuleDependencies, ModuleNode};
pub use error::{LifecycleOperation, RegistryError};
