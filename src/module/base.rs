//! Base module scaffolding
//!
//! `BaseModule` holds metadata and the active flag so concrete modules only
//! need to embed it and delegate. It is also a complete `Module` on its own,
//! which is handy for placeholder providers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::module::context::ModuleContext;
use crate::module::traits::{Module, ModuleError, ModuleMetadata};

/// Metadata plus an atomic active flag
#[derive(Debug)]
pub struct BaseModule {
    metadata: ModuleMetadata,
    active: AtomicBool,
}

impl BaseModule {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_metadata(ModuleMetadata::new(category, name))
    }

    pub fn from_metadata(metadata: ModuleMetadata) -> Self {
        Self {
            metadata,
            active: AtomicBool::new(false),
        }
    }

    pub fn with_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata = self.metadata.with_requires(requires);
        self
    }

    pub fn with_uses<I, S>(mut self, uses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata = self.metadata.with_uses(uses);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.metadata = self.metadata.with_priority(priority);
        self
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

#[async_trait]
impl Module for BaseModule {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    async fn enable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.set_active(true);
        Ok(())
    }

    async fn disable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.set_active(false);
        Ok(())
    }

    fn is_active(&self) -> bool {
        BaseModule::is_active(self)
    }
}
