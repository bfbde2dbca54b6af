//! Registry error taxonomy

use std::fmt;
use thiserror::Error;

use crate::module::traits::ModuleError;

/// Lifecycle hook that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOperation {
    Enable,
    Disable,
}

impl fmt::Display for LifecycleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleOperation::Enable => f.write_str("enable"),
            LifecycleOperation::Disable => f.write_str("disable"),
        }
    }
}

/// Errors raised by the module registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Module name cannot be empty")]
    EmptyName,

    #[error("Module category cannot be empty for module {name:?}")]
    EmptyCategory { name: String },

    #[error("Module with name {0:?} already registered")]
    DuplicateName(String),

    #[error("Module {0:?} not found")]
    NotFound(String),

    #[error("Module {requester:?} requires category {category:?} but no modules of that category are registered")]
    UnsatisfiedDependency { requester: String, category: String },

    #[error("Circular dependency detected among modules {modules:?} (cycle: {})", .cycle.join(" -> "))]
    CircularDependency {
        /// Every module left unresolved, sorted by name
        modules: Vec<String>,
        /// One concrete cycle, first element repeated at the end
        cycle: Vec<String>,
    },

    #[error("Module {name} ({category}) failed during {operation}: {source}")]
    Lifecycle {
        category: String,
        name: String,
        operation: LifecycleOperation,
        #[source]
        source: ModuleError,
    },
}

impl RegistryError {
    pub(crate) fn lifecycle(
        category: &str,
        name: &str,
        operation: LifecycleOperation,
        source: ModuleError,
    ) -> Self {
        RegistryError::Lifecycle {
            category: category.to_string(),
            name: name.to_string(),
            operation,
            source,
        }
    }

    /// Underlying hook error for lifecycle failures
    pub fn module_error(&self) -> Option<&ModuleError> {
        match self {
            RegistryError::Lifecycle { source, .. } => Some(source),
            _ => None,
        }
    }
}
