//! Module lifecycle tests
//!
//! Enable/disable passes, partial failures, and unregistration.

use modkit::module::{
    LifecycleOperation, Module, ModuleContext, ModuleManager, ModuleState, RegistryError,
};

use super::test_utils::*;

/// event <- settings <- loader, all through required categories
async fn chain(log: &CallLog) -> (ModuleManager, Vec<std::sync::Arc<RecordingModule>>) {
    let manager = ModuleManager::new();
    let modules = vec![
        RecordingModule::new("loader", "csv-loader", log)
            .requires(&["settings"])
            .shared(),
        RecordingModule::new("event", "event-bus", log).shared(),
        RecordingModule::new("settings", "json-settings", log)
            .requires(&["event"])
            .shared(),
    ];
    for module in &modules {
        manager.register(module.clone()).await.unwrap();
    }
    (manager, modules)
}

#[tokio::test]
async fn test_enable_then_disable_in_reverse() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;
    let ctx = ModuleContext::new();

    manager.enable_all(&ctx).await.unwrap();
    assert!(manager.is_enabled().await);
    assert_eq!(
        manager.load_order().await,
        vec!["event-bus", "json-settings", "csv-loader"]
    );
    assert_eq!(log.calls("enable"), manager.load_order().await);
    assert!(modules.iter().all(|m| m.is_active()));
    assert_eq!(
        manager.get_module_state("csv-loader").await,
        Some(ModuleState::Active)
    );

    let report = manager.disable_all(&ctx).await;
    assert!(report.is_clean());
    assert!(!manager.is_enabled().await);

    let mut reversed = manager.load_order().await;
    reversed.reverse();
    assert_eq!(log.calls("disable"), reversed);
    assert_eq!(report.disabled, reversed);
    assert!(modules.iter().all(|m| m.disable_calls() == 1));
    assert_eq!(
        manager.get_module_state("event-bus").await,
        Some(ModuleState::Inactive)
    );
}

#[tokio::test]
async fn test_second_disable_pass_is_a_noop() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;
    let ctx = ModuleContext::new();

    manager.enable_all(&ctx).await.unwrap();
    manager.disable_all(&ctx).await;
    let report = manager.disable_all(&ctx).await;

    assert!(report.disabled.is_empty());
    assert!(modules.iter().all(|m| m.disable_calls() == 1));
}

#[tokio::test]
async fn test_disable_without_enable_is_a_noop() {
    let log = CallLog::new();
    let (manager, _modules) = chain(&log).await;

    let report = manager.disable_all(&ModuleContext::new()).await;
    assert!(report.is_clean());
    assert!(report.disabled.is_empty());
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_missing_provider_enables_nothing() {
    let log = CallLog::new();
    let manager = ModuleManager::new();
    let event = RecordingModule::new("event", "event-bus", &log).shared();
    let screen = RecordingModule::new("ui", "lesson-screen", &log)
        .requires(&["event", "speech"])
        .shared();
    manager.register(event.clone()).await.unwrap();
    manager.register(screen.clone()).await.unwrap();

    let err = manager.enable_all(&ModuleContext::new()).await.unwrap_err();
    match err {
        RegistryError::UnsatisfiedDependency {
            requester,
            category,
        } => {
            assert_eq!(requester, "lesson-screen");
            assert_eq!(category, "speech");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!event.is_active());
    assert!(!screen.is_active());
    assert!(log.entries().is_empty());
    assert!(!manager.is_enabled().await);
    assert!(manager.load_order().await.is_empty());
}

#[tokio::test]
async fn test_enable_failure_keeps_earlier_modules() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;
    let settings = &modules[2];
    settings.set_fail_enable(true);

    let err = manager.enable_all(&ModuleContext::new()).await.unwrap_err();
    match &err {
        RegistryError::Lifecycle {
            category,
            name,
            operation,
            ..
        } => {
            assert_eq!(category, "settings");
            assert_eq!(name, "json-settings");
            assert_eq!(*operation, LifecycleOperation::Enable);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("refused to start"));

    // No rollback, no further activation
    assert_eq!(log.calls("enable"), vec!["event-bus", "json-settings"]);
    assert!(modules[1].is_active());
    assert!(!settings.is_active());
    assert!(!modules[0].is_active());
    assert!(!manager.is_enabled().await);
    assert!(matches!(
        manager.get_module_state("json-settings").await,
        Some(ModuleState::Failed(_))
    ));

    // The caller may compensate
    let report = manager.disable_all(&ModuleContext::new()).await;
    assert_eq!(report.disabled, vec!["event-bus"]);
    assert!(!modules[1].is_active());
}

#[tokio::test]
async fn test_retry_after_failure_skips_active_modules() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;
    modules[2].set_fail_enable(true);
    let ctx = ModuleContext::new();

    assert!(manager.enable_all(&ctx).await.is_err());
    modules[2].set_fail_enable(false);
    manager.enable_all(&ctx).await.unwrap();

    assert_eq!(modules[1].enable_calls(), 1);
    assert_eq!(modules[2].enable_calls(), 2);
    assert_eq!(modules[0].enable_calls(), 1);
    assert!(modules.iter().all(|m| m.is_active()));
    assert!(manager.is_enabled().await);
}

#[tokio::test]
async fn test_teardown_continues_past_failures() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;
    let ctx = ModuleContext::new();
    manager.enable_all(&ctx).await.unwrap();
    modules[2].set_fail_disable(true);

    let report = manager.disable_all(&ctx).await;

    assert_eq!(
        log.calls("disable"),
        vec!["csv-loader", "json-settings", "event-bus"]
    );
    assert_eq!(report.disabled, vec!["csv-loader", "event-bus"]);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        &report.failed[0],
        RegistryError::Lifecycle { name, operation: LifecycleOperation::Disable, .. }
            if name == "json-settings"
    ));
    assert!(!manager.is_enabled().await);
}

#[tokio::test]
async fn test_modules_can_be_enabled_again() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;
    let ctx = ModuleContext::new();

    manager.enable_all(&ctx).await.unwrap();
    manager.disable_all(&ctx).await;
    log.clear();
    manager.enable_all(&ctx).await.unwrap();

    assert_eq!(log.calls("enable").len(), 3);
    assert!(modules.iter().all(|m| m.enable_calls() == 2));
}

#[tokio::test]
async fn test_unregister_active_module() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;
    let ctx = ModuleContext::new();
    manager.enable_all(&ctx).await.unwrap();

    manager.unregister("csv-loader").await.unwrap();

    assert_eq!(modules[0].disable_calls(), 1);
    assert!(!modules[0].is_active());
    assert!(manager.get_module("csv-loader").await.is_none());
    assert!(manager.get_modules_by_category("loader").await.is_empty());
    assert!(!manager.list_categories().await.contains(&"loader".to_string()));
    assert!(!manager.load_order().await.contains(&"csv-loader".to_string()));

    let resolution = manager.resolve_load_order().await.unwrap();
    assert_eq!(resolution.load_order, vec!["event-bus", "json-settings"]);

    // The teardown pass does not reach the removed module again
    manager.disable_all(&ctx).await;
    assert_eq!(modules[0].disable_calls(), 1);
}

#[tokio::test]
async fn test_unregister_inactive_module_skips_disable() {
    let log = CallLog::new();
    let (manager, modules) = chain(&log).await;

    manager.unregister("event-bus").await.unwrap();

    assert_eq!(modules[1].disable_calls(), 0);
    assert_eq!(manager.module_count().await, 2);
    assert!(matches!(
        manager.unregister("event-bus").await,
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unregister_propagates_disable_failure() {
    let log = CallLog::new();
    let manager = ModuleManager::new();
    let stubborn = RecordingModule::new("engine", "speech-engine", &log)
        .failing_disable()
        .shared();
    manager.register(stubborn.clone()).await.unwrap();
    manager.enable_all(&ModuleContext::new()).await.unwrap();

    let err = manager.unregister("speech-engine").await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Lifecycle {
            operation: LifecycleOperation::Disable,
            ..
        }
    ));
    assert!(manager.get_module("speech-engine").await.is_some());
    assert!(stubborn.is_active());
}
