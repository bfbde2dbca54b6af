//! Execution context handed to module lifecycle hooks
//!
//! Carries a cancellation token, an optional deadline, and (when the hook is
//! driven by the registry) a read-only lookup handle into the registry.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::module::lookup::ModuleLookup;
use crate::module::traits::ModuleError;

/// Cancellable, deadline-bearing context for module hooks
#[derive(Debug, Clone, Default)]
pub struct ModuleContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    lookup: Option<ModuleLookup>,
}

impl ModuleContext {
    /// Create a context with no deadline that is never cancelled unless asked to
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that expires after `timeout`
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    /// Create a context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }

    /// Derive a child context
    ///
    /// Cancelling the parent cancels the child, not the other way round.
    /// The deadline and lookup handle are inherited.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            lookup: self.lookup.clone(),
        }
    }

    /// Attach a registry lookup handle
    pub fn with_lookup(mut self, lookup: ModuleLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Registry lookup handle, present when the hook is driven by a registry
    pub fn lookup(&self) -> Option<&ModuleLookup> {
        self.lookup.as_ref()
    }

    /// Request cancellation of this context and all of its children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Underlying cancellation token, for handing to spawned tasks
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Completes when the context is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Return a cancellation-kind error if the context is already done
    pub fn check(&self) -> Result<(), ModuleError> {
        if self.token.is_cancelled() {
            return Err(ModuleError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ModuleError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Run a future until it completes, the context is cancelled, or the deadline passes
    pub async fn run<F, T>(&self, future: F) -> Result<T, ModuleError>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    value = future => Ok(value),
                    _ = self.token.cancelled() => Err(ModuleError::Cancelled),
                    _ = tokio::time::sleep_until(deadline) => Err(ModuleError::DeadlineExceeded),
                }
            }
            None => {
                tokio::select! {
                    value = future => Ok(value),
                    _ = self.token.cancelled() => Err(ModuleError::Cancelled),
                }
            }
        }
    }
}
