//! Event notification system for modules
//!
//! Named topics that any module can create, subscribe to and trigger.
//! Topics are created lazily on first `create_event`; later calls return the
//! same topic. Dispatch is synchronous and ordered: handlers run in
//! subscription order and the first failing handler stops the dispatch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::module::base::BaseModule;
use crate::module::context::ModuleContext;
use crate::module::traits::{EventModule, Module, ModuleError, ModuleMetadata};

/// Category served by [`EventManager`]
pub const EVENT_CATEGORY: &str = "event";

/// Callback invoked when an event is triggered
pub type EventHandler = Arc<dyn Fn(&Value) -> Result<(), ModuleError> + Send + Sync>;

/// Wrap a closure as an [`EventHandler`]
pub fn handler<F>(f: F) -> EventHandler
where
    F: Fn(&Value) -> Result<(), ModuleError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Identifies one subscription on one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named topic with an ordered handler list
pub struct Event {
    name: String,
    handlers: RwLock<Vec<(SubscriptionId, EventHandler)>>,
    next_id: AtomicU64,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("name", &self.name).finish()
    }
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a handler; it runs after every handler subscribed before it
    pub async fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().await.push((id, handler));
        id
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), ModuleError> {
        let mut handlers = self.handlers.write().await;
        match handlers.iter().position(|(sid, _)| *sid == id) {
            Some(pos) => {
                handlers.remove(pos);
                Ok(())
            }
            None => Err(ModuleError::SubscriptionNotFound {
                event: self.name.clone(),
                id,
            }),
        }
    }

    /// Dispatch `data` to every handler in order, stopping at the first failure
    ///
    /// Handlers run on a snapshot, so they may subscribe or unsubscribe
    /// without deadlocking; such changes apply from the next trigger.
    pub async fn trigger(&self, data: &Value) -> Result<(), ModuleError> {
        let snapshot: Vec<EventHandler> = self
            .handlers
            .read()
            .await
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();

        debug!("Triggering event {} ({} handlers)", self.name, snapshot.len());
        for h in snapshot {
            h(data).map_err(|e| ModuleError::HandlerFailed {
                event: self.name.clone(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

/// Event subscription manager, registered as the `event` provider
pub struct EventManager {
    base: BaseModule,
    events: RwLock<HashMap<String, Arc<Event>>>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    /// Create a new event manager
    pub fn new() -> Self {
        Self {
            // Most modules depend on events, so this provider activates early
            base: BaseModule::new(EVENT_CATEGORY, "event-module").with_priority(2000),
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Get an existing event by name
    pub async fn get_event(&self, name: &str) -> Option<Arc<Event>> {
        self.events.read().await.get(name).cloned()
    }

    /// All event names, sorted
    pub async fn list_events(&self) -> Vec<String> {
        let mut names: Vec<String> = self.events.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    async fn existing(&self, event_name: &str) -> Result<Arc<Event>, ModuleError> {
        if event_name.is_empty() {
            return Err(ModuleError::InvalidArgument(
                "event name cannot be empty".to_string(),
            ));
        }
        self.get_event(event_name)
            .await
            .ok_or_else(|| ModuleError::EventNotFound(event_name.to_string()))
    }
}

#[async_trait]
impl Module for EventManager {
    fn metadata(&self) -> &ModuleMetadata {
        self.base.metadata()
    }

    async fn enable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.base.set_active(true);
        info!("Event module enabled");
        Ok(())
    }

    async fn disable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        let cleared = {
            let mut events = self.events.write().await;
            let count = events.len();
            events.clear();
            count
        };
        self.base.set_active(false);
        info!("Event module disabled ({} events cleared)", cleared);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.base.is_active()
    }

    fn as_event_module(&self) -> Option<&dyn EventModule> {
        Some(self)
    }
}

#[async_trait]
impl EventModule for EventManager {
    async fn create_event(&self, name: &str) -> Result<Arc<Event>, ModuleError> {
        if name.is_empty() {
            return Err(ModuleError::InvalidArgument(
                "event name cannot be empty".to_string(),
            ));
        }

        let mut events = self.events.write().await;
        if let Some(existing) = events.get(name) {
            return Ok(Arc::clone(existing));
        }

        let event = Arc::new(Event::new(name));
        events.insert(name.to_string(), Arc::clone(&event));
        debug!("Created event: {}", name);
        Ok(event)
    }

    async fn subscribe(
        &self,
        event_name: &str,
        handler: EventHandler,
    ) -> Result<SubscriptionId, ModuleError> {
        let event = self.existing(event_name).await?;
        Ok(event.subscribe(handler).await)
    }

    async fn unsubscribe(&self, event_name: &str, id: SubscriptionId) -> Result<(), ModuleError> {
        let event = self.existing(event_name).await?;
        event.unsubscribe(id).await
    }

    async fn trigger(&self, event_name: &str, data: &Value) -> Result<(), ModuleError> {
        let event = self.existing(event_name).await?;
        event.trigger(data).await
    }
}
