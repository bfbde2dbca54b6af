//! Module manager: the registry that owns every module
//!
//! Handles registration, default-provider lookup, dependency resolution and
//! the enable/disable passes that walk the resolved order.
//!
//! All registry state sits behind one reader-writer lock. Lookups take the
//! shared side, mutations take the exclusive side, and the lock is always
//! released before a module hook runs so a slow hook never blocks lookups.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::module::context::ModuleContext;
use crate::module::lookup::{ManagedModule, ModuleLookup, RegistryState};
use crate::module::registry::dependencies::{DependencyResolution, ModuleDependencies, ModuleNode};
use crate::module::registry::error::{LifecycleOperation, RegistryError};
use crate::module::traits::{Module, ModuleState};
use crate::utils::lock::{with_read_lock, with_write_lock};

/// Outcome of a disable pass
///
/// Teardown is best-effort: failures are collected here (and logged) but
/// never stop the walk.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Modules whose disable hook succeeded, in the order they were disabled
    pub disabled: Vec<String>,
    /// Disable failures, in the order they happened
    pub failed: Vec<RegistryError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Module manager coordinates all registered modules
pub struct ModuleManager {
    state: Arc<RwLock<RegistryState>>,
    /// Serializes enable/disable passes and unregistration
    lifecycle: Mutex<()>,
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            lifecycle: Mutex::new(()),
        }
    }

    /// Read-only handle for modules
    pub fn lookup(&self) -> ModuleLookup {
        ModuleLookup::new(&self.state)
    }

    /// Register a module
    ///
    /// Validation happens before any mutation; on error the registry is unchanged.
    /// Registration never enables the module.
    pub async fn register(&self, module: Arc<dyn Module>) -> Result<(), RegistryError> {
        let name = module.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let category = module.category().to_string();
        if category.is_empty() {
            return Err(RegistryError::EmptyCategory { name });
        }

        let mut state = self.state.write().await;
        if state.modules.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        state
            .by_category
            .entry(category.clone())
            .or_default()
            .push(Arc::clone(&module));
        state.modules.insert(
            name.clone(),
            ManagedModule {
                module,
                state: ModuleState::Registered,
            },
        );

        debug!("Registered module {} ({})", name, category);
        Ok(())
    }

    /// Unregister a module, disabling it first if it is active
    pub async fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        self.unregister_with(name, &ModuleContext::new()).await
    }

    /// Unregister a module, using `ctx` for the forced disable
    ///
    /// A failed disable aborts the unregistration and leaves the module registered.
    pub async fn unregister_with(
        &self,
        name: &str,
        ctx: &ModuleContext,
    ) -> Result<(), RegistryError> {
        let _pass = self.lifecycle.lock().await;

        let module = self
            .get_module(name)
            .await
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        if module.is_active() {
            info!("Disabling module {} before unregistering", name);
            self.disable_module(&module, ctx).await?;
        }

        let mut state = self.state.write().await;
        if state.modules.remove(name).is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }

        let category = module.category();
        if let Some(bucket) = state.by_category.get_mut(category) {
            bucket.retain(|m| m.name() != name);
            if bucket.is_empty() {
                state.by_category.remove(category);
            }
        }
        state.load_order.retain(|n| n != name);

        info!("Unregistered module {} ({})", name, category);
        Ok(())
    }

    /// Get a module by name
    pub async fn get_module(&self, name: &str) -> Option<Arc<dyn Module>> {
        with_read_lock(&self.state, |s| s.get_module(name)).await
    }

    /// Get every module of a category, highest preference first
    pub async fn get_modules_by_category(&self, category: &str) -> Vec<Arc<dyn Module>> {
        with_read_lock(&self.state, |s| s.modules_by_category(category)).await
    }

    /// Get the default provider of a category
    ///
    /// Highest priority wins; equal priorities resolve to the smallest name.
    pub async fn get_default_module(&self, category: &str) -> Option<Arc<dyn Module>> {
        with_read_lock(&self.state, |s| s.default_module(category)).await
    }

    /// All registered module names, sorted
    pub async fn list_modules(&self) -> Vec<String> {
        with_read_lock(&self.state, |s| {
            let mut names: Vec<String> = s.modules.keys().cloned().collect();
            names.sort();
            names
        })
        .await
    }

    /// All registered categories, sorted
    pub async fn list_categories(&self) -> Vec<String> {
        with_read_lock(&self.state, |s| {
            let mut categories: Vec<String> = s.by_category.keys().cloned().collect();
            categories.sort();
            categories
        })
        .await
    }

    pub async fn module_count(&self) -> usize {
        with_read_lock(&self.state, |s| s.modules.len()).await
    }

    pub async fn category_count(&self) -> usize {
        with_read_lock(&self.state, |s| s.by_category.len()).await
    }

    /// Registry-tracked lifecycle state of a module
    pub async fn get_module_state(&self, name: &str) -> Option<ModuleState> {
        with_read_lock(&self.state, |s| s.modules.get(name).map(|m| m.state.clone())).await
    }

    /// Whether the last enable pass completed without a later disable pass
    pub async fn is_enabled(&self) -> bool {
        with_read_lock(&self.state, |s| s.enabled).await
    }

    /// Order recorded by the last enable pass
    pub async fn load_order(&self) -> Vec<String> {
        with_read_lock(&self.state, |s| s.load_order.clone()).await
    }

    /// Set the resource location for a module
    pub async fn set_resource_path(&self, name: &str, path: impl Into<PathBuf>) {
        let path = path.into();
        with_write_lock(&self.state, |s| {
            s.resource_paths.insert(name.to_string(), path);
        })
        .await
    }

    /// Get the resource location for a module
    pub async fn get_resource_path(&self, name: &str) -> Option<PathBuf> {
        with_read_lock(&self.state, |s| s.resource_paths.get(name).cloned()).await
    }

    /// Compute the activation order for the current module set without recording it
    ///
    /// Providers are recomputed from scratch on every call.
    pub async fn resolve_load_order(&self) -> Result<DependencyResolution, RegistryError> {
        let nodes = with_read_lock(&self.state, Self::snapshot_nodes).await;
        ModuleDependencies::resolve(&nodes)
    }

    /// Enable every registered module in dependency order
    ///
    /// Stops at the first failing module. Modules enabled before the failure
    /// stay enabled; compensating with `disable_all` is up to the caller.
    pub async fn enable_all(&self, ctx: &ModuleContext) -> Result<(), RegistryError> {
        let _pass = self.lifecycle.lock().await;

        let ordered = {
            let mut state = self.state.write().await;
            let nodes = Self::snapshot_nodes(&state);
            let resolution = ModuleDependencies::resolve(&nodes)?;
            let ordered: Vec<Arc<dyn Module>> = resolution
                .load_order
                .iter()
                .filter_map(|name| state.get_module(name))
                .collect();
            state.load_order = resolution.load_order;
            ordered
        };

        info!("Enabling {} modules", ordered.len());
        let hook_ctx = ctx.clone().with_lookup(self.lookup());

        for module in &ordered {
            if module.is_active() {
                debug!("Module {} already active, skipping", module.name());
                self.set_state(module.name(), ModuleState::Active).await;
                continue;
            }

            debug!("Enabling module {} ({})", module.name(), module.category());
            self.set_state(module.name(), ModuleState::Enabling).await;
            if let Err(e) = module.enable(&hook_ctx).await {
                error!(
                    "Failed to enable module {} ({}): {}",
                    module.name(),
                    module.category(),
                    e
                );
                self.set_state(module.name(), ModuleState::Failed(e.to_string()))
                    .await;
                return Err(RegistryError::lifecycle(
                    module.category(),
                    module.name(),
                    LifecycleOperation::Enable,
                    e,
                ));
            }
            self.set_state(module.name(), ModuleState::Active).await;
        }

        with_write_lock(&self.state, |s| s.enabled = true).await;
        info!("All modules enabled");
        Ok(())
    }

    /// Disable modules in reverse of the recorded order
    ///
    /// No-op when nothing was enabled. Every still-active module gets a
    /// disable attempt even if earlier ones fail.
    pub async fn disable_all(&self, ctx: &ModuleContext) -> ShutdownReport {
        let _pass = self.lifecycle.lock().await;

        let reversed = with_read_lock(&self.state, |s| {
            let any_active = s
                .load_order
                .iter()
                .filter_map(|name| s.modules.get(name))
                .any(|m| m.module.is_active());
            if !s.enabled && !any_active {
                return None;
            }
            Some(
                s.load_order
                    .iter()
                    .rev()
                    .map(|name| (name.clone(), s.get_module(name)))
                    .collect::<Vec<_>>(),
            )
        })
        .await;

        let Some(reversed) = reversed else {
            debug!("Modules were never enabled, nothing to disable");
            return ShutdownReport::default();
        };

        info!("Disabling modules");
        let mut report = ShutdownReport::default();

        for (name, module) in reversed {
            let Some(module) = module else {
                // Unregistered since the order was recorded
                continue;
            };
            if !module.is_active() {
                continue;
            }
            match self.disable_module(&module, ctx).await {
                Ok(()) => report.disabled.push(name),
                Err(e) => {
                    warn!("Failed to disable module {}: {}", name, e);
                    report.failed.push(e);
                }
            }
        }

        with_write_lock(&self.state, |s| s.enabled = false).await;
        info!(
            "Modules disabled ({} ok, {} failed)",
            report.disabled.len(),
            report.failed.len()
        );
        report
    }

    /// Run one module's disable hook outside the registry lock
    async fn disable_module(
        &self,
        module: &Arc<dyn Module>,
        ctx: &ModuleContext,
    ) -> Result<(), RegistryError> {
        let hook_ctx = ctx.clone().with_lookup(self.lookup());
        self.set_state(module.name(), ModuleState::Disabling).await;

        match module.disable(&hook_ctx).await {
            Ok(()) => {
                self.set_state(module.name(), ModuleState::Inactive).await;
                debug!("Disabled module {} ({})", module.name(), module.category());
                Ok(())
            }
            Err(e) => {
                self.set_state(module.name(), ModuleState::Failed(e.to_string()))
                    .await;
                Err(RegistryError::lifecycle(
                    module.category(),
                    module.name(),
                    LifecycleOperation::Disable,
                    e,
                ))
            }
        }
    }

    async fn set_state(&self, name: &str, new_state: ModuleState) {
        with_write_lock(&self.state, |s| {
            if let Some(managed) = s.modules.get_mut(name) {
                managed.state = new_state;
            }
        })
        .await
    }

    fn snapshot_nodes(state: &RegistryState) -> Vec<ModuleNode> {
        state
            .modules
            .values()
            .map(|m| ModuleNode::from_module(m.module.as_ref()))
            .collect()
    }
}
