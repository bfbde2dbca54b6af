//! Built-in capability module tests
//!
//! The event, settings and execute modules wired through a real registry,
//! plus a consumer that finds them at runtime through the context lookup.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use modkit::module::api::{handler, EXECUTE_START_EVENT, EXECUTE_STOP_EVENT};
use modkit::module::{
    BaseModule, EventManager, EventModule, ExecuteModule, Module, ModuleContext, ModuleError,
    ModuleManager, ModuleMetadata, SettingsModule, SettingsStore,
};

#[derive(Default)]
struct ScreenState {
    seen_theme: Mutex<Option<String>>,
    opened: Mutex<Vec<Value>>,
}

/// Requires events, optionally uses settings
struct LessonScreen {
    base: BaseModule,
    state: Arc<ScreenState>,
}

impl LessonScreen {
    fn new() -> Self {
        Self {
            base: BaseModule::new("ui", "lesson-screen")
                .with_requires(["event"])
                .with_uses(["settings"]),
            state: Arc::default(),
        }
    }
}

#[async_trait]
impl Module for LessonScreen {
    fn metadata(&self) -> &ModuleMetadata {
        self.base.metadata()
    }

    async fn enable(&self, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let lookup = ctx
            .lookup()
            .ok_or_else(|| ModuleError::DependencyUnavailable("lookup".into()))?;

        // Soft dependency: tolerate absence
        if let Some(settings) = lookup.get_default_module("settings").await {
            if let Some(store) = settings.as_settings_module() {
                let theme = store.get_string("ui.theme").await.ok();
                *self.state.seen_theme.lock().unwrap() = theme;
            }
        }

        let events = lookup
            .get_default_module("event")
            .await
            .ok_or_else(|| ModuleError::DependencyUnavailable("event".into()))?;
        let events = events
            .as_event_module()
            .ok_or_else(|| ModuleError::DependencyUnavailable("event capability".into()))?;

        events.create_event("lesson.opened").await?;
        let state = Arc::clone(&self.state);
        events
            .subscribe(
                "lesson.opened",
                handler(move |data| {
                    state.opened.lock().unwrap().push(data.clone());
                    Ok(())
                }),
            )
            .await?;

        self.base.set_active(true);
        Ok(())
    }

    async fn disable(&self, _ctx: &ModuleContext) -> Result<(), ModuleError> {
        self.base.set_active(false);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.base.is_active()
    }
}

#[tokio::test]
async fn test_consumer_finds_capabilities_through_lookup() {
    let dir = TempDir::new().unwrap();
    let manager = ModuleManager::new();
    let events = Arc::new(EventManager::new());
    let screen = Arc::new(LessonScreen::new());

    manager.register(screen.clone()).await.unwrap();
    manager
        .register(Arc::new(SettingsStore::new(dir.path().join("settings.json"))))
        .await
        .unwrap();
    manager.register(events.clone()).await.unwrap();

    manager.enable_all(&ModuleContext::new()).await.unwrap();

    // Providers by priority: event (2000), settings (1500), then the screen
    assert_eq!(
        manager.load_order().await,
        vec!["event-module", "settings-module", "lesson-screen"]
    );
    assert_eq!(screen.state.seen_theme.lock().unwrap().as_deref(), Some("default"));

    events
        .trigger("lesson.opened", &json!({ "lesson": 3 }))
        .await
        .unwrap();
    assert_eq!(*screen.state.opened.lock().unwrap(), vec![json!({ "lesson": 3 })]);
}

#[tokio::test]
async fn test_consumer_tolerates_missing_soft_dependency() {
    let manager = ModuleManager::new();
    let screen = Arc::new(LessonScreen::new());
    manager.register(screen.clone()).await.unwrap();
    manager.register(Arc::new(EventManager::new())).await.unwrap();

    manager.enable_all(&ModuleContext::new()).await.unwrap();
    assert!(screen.is_active());
    assert!(screen.state.seen_theme.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_settings_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("settings.json");
    let ctx = ModuleContext::new();

    {
        let manager = ModuleManager::new();
        let store = Arc::new(SettingsStore::new(&path));
        manager.register(store.clone()).await.unwrap();
        manager.enable_all(&ctx).await.unwrap();

        let settings = manager.get_default_module("settings").await.unwrap();
        let settings = settings.as_settings_module().unwrap();
        settings.set_setting("ui.language", json!("fr")).await.unwrap();
        assert!(manager.disable_all(&ctx).await.is_clean());
    }

    let manager = ModuleManager::new();
    manager
        .register(Arc::new(SettingsStore::new(&path)))
        .await
        .unwrap();
    manager.enable_all(&ctx).await.unwrap();
    let settings = manager.get_module("settings-module").await.unwrap();
    let settings = settings.as_settings_module().unwrap();
    assert_eq!(settings.get_string("ui.language").await.unwrap(), "fr");
    assert_eq!(settings.get_int("window.height").await.unwrap(), 600);
}

#[tokio::test]
async fn test_execute_without_event_provider_fails_resolution() {
    let manager = ModuleManager::new();
    let execute = Arc::new(ExecuteModule::new());
    manager.register(execute.clone()).await.unwrap();

    assert!(manager.enable_all(&ModuleContext::new()).await.is_err());
    assert!(!execute.is_active());
}

#[tokio::test]
async fn test_execute_run_until_cancelled() {
    let manager = ModuleManager::new();
    let events = Arc::new(EventManager::new());
    let execute = Arc::new(ExecuteModule::new().with_heartbeat(Duration::from_millis(5)));
    manager.register(execute.clone()).await.unwrap();
    manager.register(events.clone()).await.unwrap();
    manager.enable_all(&ModuleContext::new()).await.unwrap();

    let stops = Arc::new(Mutex::new(Vec::new()));
    {
        let stops = Arc::clone(&stops);
        events
            .subscribe(
                EXECUTE_STOP_EVENT,
                handler(move |data| {
                    stops.lock().unwrap().push(data["profile"].clone());
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert!(events.get_event(EXECUTE_START_EVENT).await.is_some());
    }

    execute.set_profile("review").await.unwrap();
    let ctx = ModuleContext::new();
    let runner = {
        let execute = Arc::clone(&execute);
        let ctx = ctx.clone();
        tokio::spawn(async move { execute.run(&ctx).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    ctx.cancel();
    let result = runner.await.unwrap();

    assert!(matches!(result, Err(ModuleError::Cancelled)));
    assert_eq!(*stops.lock().unwrap(), vec![json!("review")]);
    assert!(manager.disable_all(&ModuleContext::new()).await.is_clean());
    assert!(!execute.is_active());
}
