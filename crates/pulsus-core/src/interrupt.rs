//! Cooperative cancellation token for the routing pipeline.
//!
//! The router polls `check` at every stage boundary; the validation pipeline
//! additionally `select!`s on `cancelled` so an in-flight subprocess is killed
//! rather than merely skipping the next stage. Cloning shares the same flag.

use crate::error::RouteError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared cancellation flag, typically triggered from a Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct InterruptToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl InterruptToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; wakes any task parked in `cancelled`.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Stage-boundary poll: `Err(Interrupted)` once triggered.
    pub fn check(&self) -> Result<(), RouteError> {
        if self.is_triggered() {
            Err(RouteError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Resolves when cancellation is requested. Never resolves otherwise.
    pub async fn cancelled(&self) {
        loop {
            // Register the waiter before re-reading the flag so a trigger
            // between the check and the await cannot be missed.
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passes_until_triggered() {
        let token = InterruptToken::new();
        assert!(token.check().is_ok());
        token.trigger();
        assert!(matches!(token.check(), Err(RouteError::Interrupted)));
        // Idempotent.
        token.trigger();
        assert!(token.is_triggered());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = InterruptToken::new();
        let other = token.clone();
        other.trigger();
        assert!(token.check().is_err());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_trigger() {
        let token = InterruptToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        token.trigger();
        handle.await.unwrap();
    }
}
