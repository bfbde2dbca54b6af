//! Lock utilities for async contexts
//!
//! Scoped access to a `tokio::sync::RwLock`: the guard is released as soon as
//! the closure returns, so it can never be held across an `.await`.

use tokio::sync::RwLock;

/// Execute a closure with a read lock, automatically releasing it
pub async fn with_read_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&T) -> R,
{
    let guard = rwlock.read().await;
    f(&guard)
}

/// Execute a closure with a write lock, automatically releasing it
pub async fn with_write_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    let mut guard = rwlock.write().await;
    f(&mut guard)
}
