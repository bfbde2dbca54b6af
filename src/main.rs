//! modkit host
//!
//! Registers the built-in modules, enables them in dependency order, runs the
//! execute module until a shutdown signal (or `--timeout`), then tears every
//! module down in reverse order.
//!
//! Usage:
//!   modkit [--config FILE] [--profile NAME] [--log-filter F] [--settings FILE]
//!          [--list-modules] [--timeout SECS]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use modkit::config::{AppConfig, LoggingConfig};
use modkit::module::{
    EventManager, ExecuteModule, Module, ModuleContext, ModuleManager, SettingsStore,
};
use modkit::utils::{cancel_on_shutdown, init_logging_from_config};

#[derive(Parser, Debug)]
#[command(name = "modkit", version, about = "Module registry and lifecycle host")]
struct Args {
    /// Configuration file (.toml, otherwise JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Execution profile (overrides the config file)
    #[arg(long)]
    profile: Option<String>,

    /// Log filter (RUST_LOG still takes precedence)
    #[arg(long)]
    log_filter: Option<String>,

    /// Settings file (overrides the config file)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Print the resolved activation order and exit
    #[arg(long)]
    list_modules: bool,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(long)]
    timeout: Option<u64>,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    if let Some(profile) = &args.profile {
        config.modules.profile = profile.clone();
    }
    if let Some(settings) = &args.settings {
        config.modules.settings_path = settings.to_string_lossy().into_owned();
    }
    if let Some(filter) = &args.log_filter {
        config
            .logging
            .get_or_insert_with(LoggingConfig::default)
            .filter = Some(filter.clone());
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging_from_config(config.logging.as_ref());

    let manager = ModuleManager::new();
    let execute = Arc::new(ExecuteModule::new().with_heartbeat(config.modules.heartbeat()));
    execute.set_profile(&config.modules.profile).await?;

    manager.register(Arc::new(EventManager::new())).await?;
    manager
        .register(Arc::new(SettingsStore::new(&config.modules.settings_path)))
        .await?;
    manager.register(execute.clone()).await?;

    for (name, path) in &config.modules.resource_paths {
        manager.set_resource_path(name, path).await;
    }

    if args.list_modules {
        let resolution = manager.resolve_load_order().await?;
        for (index, wave) in resolution.waves.iter().enumerate() {
            for name in wave {
                let category = manager
                    .get_module(name)
                    .await
                    .map(|m| m.category().to_string())
                    .unwrap_or_default();
                println!("{}\t{}\t{}", index, category, name);
            }
        }
        return Ok(());
    }

    let enable_ctx = match config.modules.enable_timeout() {
        Some(timeout) => ModuleContext::with_timeout(timeout),
        None => ModuleContext::new(),
    };
    if let Err(e) = manager.enable_all(&enable_ctx).await {
        error!("Startup failed: {}", e);
        let report = manager.disable_all(&ModuleContext::new()).await;
        for failure in &report.failed {
            warn!("Cleanup after failed startup: {}", failure);
        }
        return Err(e).context("enabling modules");
    }
    info!(
        "Enabled {} modules: {}",
        manager.module_count().await,
        manager.load_order().await.join(", ")
    );

    let run_ctx = match args.timeout {
        Some(secs) => ModuleContext::with_timeout(Duration::from_secs(secs)),
        None => ModuleContext::new(),
    };
    let watcher = cancel_on_shutdown(run_ctx.token().clone());

    match execute.run(&run_ctx).await {
        Err(e) if e.is_cancellation() => info!("Execution finished: {}", e),
        Err(e) => error!("Execution failed: {}", e),
        Ok(()) => {}
    }
    run_ctx.cancel();
    if let Err(e) = watcher.await {
        warn!("Signal watcher ended abnormally: {}", e);
    }

    let report = manager.disable_all(&ModuleContext::new()).await;
    if report.is_clean() {
        info!("Shutdown complete ({} modules disabled)", report.disabled.len());
    } else {
        for failure in &report.failed {
            warn!("Shutdown: {}", failure);
        }
    }

    Ok(())
}
