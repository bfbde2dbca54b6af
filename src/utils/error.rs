//! Error handling helpers for best-effort operations
//!
//! Used where a failure must be reported but must not stop the caller, such
//! as persisting settings during shutdown.

use tracing::warn;

/// Run a fallible operation, logging and discarding its error
///
/// Returns `Some(T)` on success, `None` on error (after logging).
pub fn log_error<F, T, E>(operation: F, context: &str) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    match operation() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {}", context, e);
            None
        }
    }
}

/// Async form of [`log_error`]
///
/// # Example
/// ```no_run
/// # async fn demo(store: &modkit::module::SettingsStore) {
/// use modkit::module::SettingsModule;
/// use modkit::utils::log_error_async;
///
/// log_error_async(|| store.save_settings(), "Failed to save settings").await;
/// # }
/// ```
pub async fn log_error_async<F, Fut, T, E>(operation: F, context: &str) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match operation().await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {}", context, e);
            None
        }
    }
}
