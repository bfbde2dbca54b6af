//! Concurrent access to the registry
//!
//! Hooks run outside the registry lock, registrations from many tasks stay
//! consistent, and cancellation reaches a blocked enable hook.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use modkit::module::{Module, ModuleContext, ModuleManager, ModuleState, RegistryError};

use super::test_utils::*;

#[tokio::test]
async fn test_lookups_proceed_during_slow_enable() {
    let log = CallLog::new();
    let manager = Arc::new(ModuleManager::new());
    manager
        .register(RecordingModule::new("catalog", "catalog", &log).shared())
        .await
        .unwrap();
    manager
        .register(
            RecordingModule::new("engine", "slow-engine", &log)
                .slow_enable(Duration::from_millis(300))
                .shared(),
        )
        .await
        .unwrap();

    let pass = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.enable_all(&ModuleContext::new()).await })
    };

    // Wait until the slow hook is running
    timeout(Duration::from_secs(2), async {
        while manager.get_module_state("slow-engine").await != Some(ModuleState::Enabling) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    // Read-only queries do not wait for the hook
    let found = timeout(Duration::from_millis(100), manager.get_module("catalog"))
        .await
        .unwrap();
    assert!(found.is_some());
    let names = timeout(Duration::from_millis(100), manager.list_modules())
        .await
        .unwrap();
    assert_eq!(names.len(), 2);

    pass.await.unwrap().unwrap();
    assert_eq!(
        manager.get_module_state("slow-engine").await,
        Some(ModuleState::Active)
    );
}

#[tokio::test]
async fn test_cancellation_reaches_blocked_hook() {
    let log = CallLog::new();
    let manager = Arc::new(ModuleManager::new());
    let slow = RecordingModule::new("engine", "slow-engine", &log)
        .slow_enable(Duration::from_secs(60))
        .shared();
    manager.register(slow.clone()).await.unwrap();

    let ctx = ModuleContext::new();
    let pass = {
        let manager = Arc::clone(&manager);
        let ctx = ctx.clone();
        tokio::spawn(async move { manager.enable_all(&ctx).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel();

    let err = timeout(Duration::from_secs(2), pass)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(err.module_error().map(|e| e.is_cancellation()).unwrap_or(false));
    assert!(!slow.is_active());
}

#[tokio::test]
async fn test_deadline_reaches_blocked_hook() {
    let log = CallLog::new();
    let manager = ModuleManager::new();
    manager
        .register(
            RecordingModule::new("engine", "slow-engine", &log)
                .slow_enable(Duration::from_secs(60))
                .shared(),
        )
        .await
        .unwrap();

    let ctx = ModuleContext::with_timeout(Duration::from_millis(30));
    let err = manager.enable_all(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Lifecycle {
            source: modkit::module::ModuleError::DeadlineExceeded,
            ..
        }
    ));
}

#[tokio::test]
async fn test_concurrent_registration() {
    let log = CallLog::new();
    let manager = Arc::new(ModuleManager::new());

    let mut tasks = Vec::new();
    for i in 0..32 {
        let manager = Arc::clone(&manager);
        let log = log.clone();
        tasks.push(tokio::spawn(async move {
            let category = format!("cat-{}", i % 4);
            manager
                .register(RecordingModule::new(&category, &format!("m-{i}"), &log).shared())
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(manager.module_count().await, 32);
    assert_eq!(manager.category_count().await, 4);
    for category in manager.list_categories().await {
        assert_eq!(manager.get_modules_by_category(&category).await.len(), 8);
    }
}

#[tokio::test]
async fn test_racing_duplicate_registration_has_one_winner() {
    let log = CallLog::new();
    let manager = Arc::new(ModuleManager::new());

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let manager = Arc::clone(&manager);
        let log = log.clone();
        tasks.push(tokio::spawn(async move {
            manager
                .register(RecordingModule::new("loader", "csv", &log).shared())
                .await
        }));
    }

    let mut wins = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => wins += 1,
            Err(RegistryError::DuplicateName(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(manager.module_count().await, 1);
    assert_eq!(manager.get_modules_by_category("loader").await.len(), 1);
}

#[tokio::test]
async fn test_registries_are_isolated() {
    let log = CallLog::new();
    let first = ModuleManager::new();
    let second = ModuleManager::new();
    first
        .register(RecordingModule::new("loader", "csv", &log).shared())
        .await
        .unwrap();

    assert_eq!(first.module_count().await, 1);
    assert_eq!(second.module_count().await, 0);
    second
        .register(RecordingModule::new("loader", "csv", &log).shared())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_lookup_handle_does_not_keep_registry_alive() {
    let manager = ModuleManager::new();
    let lookup = manager.lookup();
    assert!(lookup.is_alive());
    drop(manager);
    assert!(!lookup.is_alive());
    assert!(lookup.get_default_module("event").await.is_none());
}
