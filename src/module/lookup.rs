//! Read-only registry view handed to modules
//!
//! Modules never see registry locks or mutation methods. They receive a
//! `ModuleLookup` through their `ModuleContext` and may keep a clone of it;
//! it holds the registry weakly, so a module storing one does not keep the
//! registry (and therefore itself) alive.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;

use crate::module::registry::dependencies::preference_order;
use crate::module::traits::{Module, ModuleState};

/// Registry-owned module entry
pub(crate) struct ManagedModule {
    pub(crate) module: Arc<dyn Module>,
    pub(crate) state: ModuleState,
}

/// All registry-owned mutable state, guarded by one reader-writer lock
#[derive(Default)]
pub(crate) struct RegistryState {
    /// Unique name index
    pub(crate) modules: HashMap<String, ManagedModule>,
    /// Category index; every module appears in exactly one bucket
    pub(crate) by_category: HashMap<String, Vec<Arc<dyn Module>>>,
    /// Activation order recorded by the last successful resolution
    pub(crate) load_order: Vec<String>,
    /// Module name -> resource location
    pub(crate) resource_paths: HashMap<String, PathBuf>,
    /// Set after a fully successful enable pass, cleared by a disable pass
    pub(crate) enabled: bool,
}

impl RegistryState {
    pub(crate) fn get_module(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(name).map(|m| Arc::clone(&m.module))
    }

    /// Providers of `category` in preference order
    pub(crate) fn modules_by_category(&self, category: &str) -> Vec<Arc<dyn Module>> {
        let mut modules = self
            .by_category
            .get(category)
            .cloned()
            .unwrap_or_default();
        modules.sort_by(|a, b| preference_order(a.priority(), a.name(), b.priority(), b.name()));
        modules
    }

    pub(crate) fn default_module(&self, category: &str) -> Option<Arc<dyn Module>> {
        self.by_category.get(category).and_then(|modules| {
            modules
                .iter()
                .min_by(|a, b| preference_order(a.priority(), a.name(), b.priority(), b.name()))
                .cloned()
        })
    }
}

/// Weak, read-only handle onto a registry
#[derive(Clone)]
pub struct ModuleLookup {
    state: Weak<RwLock<RegistryState>>,
}

impl std::fmt::Debug for ModuleLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLookup")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl ModuleLookup {
    pub(crate) fn new(state: &Arc<RwLock<RegistryState>>) -> Self {
        Self {
            state: Arc::downgrade(state),
        }
    }

    /// Whether the registry behind this handle still exists
    pub fn is_alive(&self) -> bool {
        self.state.strong_count() > 0
    }

    /// Get a module by name
    pub async fn get_module(&self, name: &str) -> Option<Arc<dyn Module>> {
        let state = self.state.upgrade()?;
        let guard = state.read().await;
        guard.get_module(name)
    }

    /// Get every module of a category, in preference order
    pub async fn get_modules_by_category(&self, category: &str) -> Vec<Arc<dyn Module>> {
        let Some(state) = self.state.upgrade() else {
            return Vec::new();
        };
        let guard = state.read().await;
        guard.modules_by_category(category)
    }

    /// Get the default provider of a category
    pub async fn get_default_module(&self, category: &str) -> Option<Arc<dyn Module>> {
        let state = self.state.upgrade()?;
        let guard = state.read().await;
        guard.default_module(category)
    }
}
