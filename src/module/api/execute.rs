//! Execution module
//!
//! Drives the application's main run loop for a selected profile. Announces
//! start and stop on the `execute.start` / `execute.stop` events of the
//! default event provider and logs a heartbeat while running.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::module::api::events::{Event, EVENT_CATEGORY};
use crate::module::base::BaseModule;
use crate::module::context::ModuleContext;
use crate::module::traits::{Module, ModuleError, ModuleMetadata};

/// Category served by [`ExecuteModule`]
pub const EXECUTE_CATEGORY: &str = "execute";
pub const EXECUTE_START_EVENT: &str = "execute.start";
pub const EXECUTE_STOP_EVENT: &str = "execute.stop";

const DEFAULT_PROFILE: &str = "all";
const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);

struct Topics {
    start: Arc<Event>,
    stop: Arc<Event>,
}

/// Clears the running flag when `run` returns by any path
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ExecuteModule {
    base: BaseModule,
    profile: RwLock<String>,
    heartbeat: Duration,
    running: AtomicBool,
    heartbeats: AtomicU64,
    topics: RwLock<Option<Topics>>,
}

impl Default for ExecuteModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecuteModule {
    pub fn new() -> Self {
        Self {
            base: BaseModule::new(EXECUTE_CATEGORY, "execute-module")
                .with_requires([EVENT_CATEGORY])
                .with_priority(1000),
            profile: RwLock::new(DEFAULT_PROFILE.to_string()),
            heartbeat: DEFAULT_HEARTBEAT,
            running: AtomicBool::new(false),
            heartbeats: AtomicU64::new(0),
            topics: RwLock::new(None),
        }
    }

    /// Interval between heartbeats while running
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub async fn set_profile(&self, profile: &str) -> Result<(), ModuleError> {
        if profile.is_empty() {
            return Err(ModuleError::InvalidArgument(
                "profile cannot be empty".to_string(),
            ));
        }
        *self.profile.write().await = profile.to_string();
        debug!("Execution profile set to {}", profile);
        Ok(())
    }

    pub async fn profile(&self) -> String {
        self.profile.read().await.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Heartbeats emitted by the most recent run
    pub fn heartbeat_count(&self) -> u64 {
        self.heartbeats.load(Ordering::SeqCst)
    }

    /// Run until `ctx` is cancelled or its deadline passes
    ///
    /// Always ends with the cancellation-kind error that stopped it. The
    /// module must be enabled first.
    pub async fn run(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ModuleError::AlreadyRunning(self.name().to_string()));
        }
        let _guard = RunningGuard(&self.running);

        let (start, stop) = {
            let topics = self.topics.read().await;
            let topics = topics.as_ref().ok_or_else(|| {
                ModuleError::DependencyUnavailable(format!(
                    "{} is not enabled",
                    self.name()
                ))
            })?;
            (Arc::clone(&topics.start), Arc::clone(&topics.stop))
        };

        let profile = self.profile().await;
        self.heartbeats.store(0, Ordering::SeqCst);
        start.trigger(&json!({ "profile": profile })).await?;
        info!("Execution started (profile {})", profile);

        let mut ticker = tokio::time::interval(self.heartbeat);
        // First tick completes immediately
        ticker.tick().await;

        let reason = loop {
            match ctx.run(ticker.tick()).await {
                Ok(_) => {
                    let beat = self.heartbeats.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!("Execution heartbeat {} (profile {})", beat, profile);
                }
                Err(e) => break e,
            }
        };

        info!("Execution stopping (profile {}): {}", profile, reason);
        let payload = json!({ "profile": profile, "heartbeats": self.heartbeat_count() });
        if let Err(e) = stop.trigger(&payload).await {
            warn!("Stop notification failed: {}", e);
        }
        Err(reason)
    }
}

#[async_trait]
impl Module for ExecuteModule {
    fn metadata(&self) -> &ModuleMetadata {
        self.base.metadata()
    }

    async fn enable(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let lookup = ctx.lookup().ok_or_else(|| {
            ModuleError::DependencyUnavailable("no registry lookup in context".to_string())
        })?;
        let provider = lookup
            .get_default_module(EVENT_CATEGORY)
            .await
            .ok_or_else(|| ModuleError::DependencyUnavailable(EVENT_CATEGORY.to_string()))?;
        let events = provider.as_event_module().ok_or_else(|| {
            ModuleError::DependencyUnavailable(format!(
                "{} does not provide the event capability",
                provider.name()
            ))
        })?;

        let start = events.create_event(EXECUTE_START_EVENT).await?;
        let stop = events.create_event(EXECUTE_STOP_EVENT).await?;
        *self.topics.write().await = Some(Topics { start, stop });

        self.base.set_active(true);
        info!("Execute module enabled (events via {})", provider.name());
        Ok(())
    }

    async fn disable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.topics.write().await.take();
        self.base.set_active(false);
        info!("Execute module disabled");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.base.is_active()
    }
}
