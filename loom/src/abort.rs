//! Abort Controller (component_design §4.10): cooperative cancellation for a run,
//! with an optional wall-clock timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
#[error("run aborted")]
pub struct Aborted;

struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

/// Cooperative abort signal shared between the Turn Executor's retry loop and
/// anything that needs to observe cancellation (streaming, tool execution).
#[derive(Clone)]
pub struct AbortController {
    inner: Arc<Inner>,
    timeout_task: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl AbortController {
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner { flag: AtomicBool::new(false), notify: Notify::new() }), timeout_task: Arc::new(std::sync::Mutex::new(None)) }
    }

    /// Spawns a background task that calls `abort()` after `timeout` elapses,
    /// unless `cleanup()` runs first.
    pub fn with_timeout(timeout: Duration) -> Self {
        let controller = Self::new();
        let signal = controller.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            signal.abort();
        });
        *controller.timeout_task.lock().unwrap() = Some(handle);
        controller
    }

    pub fn abort(&self) {
        if !self.inner.flag.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Aborted> {
        if self.is_aborted() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    /// Resolves once `abort()` has been called; for callers that want to race a
    /// cancellation against other futures with `tokio::select!`.
    pub async fn aborted(&self) {
        if self.is_aborted() {
            return;
        }
        self.inner.notify.notified().await;
    }

    /// Cancels the pending timeout task, if any. Idempotent; safe to call even
    /// when the controller was built with `new()` (no timeout task).
    pub fn cleanup(&self) {
        if let Some(handle) = self.timeout_task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AbortController {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            self.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unaborted() {
        let c = AbortController::new();
        assert!(!c.is_aborted());
        assert!(c.check().is_ok());
    }

    #[test]
    fn abort_is_observable_and_idempotent() {
        let c = AbortController::new();
        c.abort();
        c.abort();
        assert!(c.is_aborted());
        assert!(c.check().is_err());
    }

    #[tokio::test]
    async fn aborted_future_resolves_after_abort() {
        let c = AbortController::new();
        let waiter = c.clone();
        let handle = tokio::spawn(async move {
            waiter.aborted().await;
        });
        tokio::task::yield_now().await;
        c.abort();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn timeout_triggers_abort() {
        let c = AbortController::with_timeout(Duration::from_millis(20));
        assert!(!c.is_aborted());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(c.is_aborted());
    }

    #[test]
    fn cleanup_is_safe_without_timeout_task() {
        let c = AbortController::new();
        c.cleanup();
        c.cleanup();
    }
}
