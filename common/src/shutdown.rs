//! Cooperative shutdown signalling.
//!
//! Loops poll the flag on their timeout branch; nothing is torn down by
//! force. The Ctrl-C handler only sets the flag. Async code that sleeps for
//! long stretches can also await [`ShutdownFlag::triggered`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared stop flag, cheap to clone across tasks and threads.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    // ---
    stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownFlag {
    // ---
    pub fn new() -> Self {
        // ---
        Self::default()
    }

    /// Requests shutdown. Idempotent.
    pub fn trigger(&self) {
        // ---
        self.stop.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Returns whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        // ---
        self.stop.load(Ordering::Acquire)
    }

    /// Resolves once shutdown has been requested.
    pub async fn triggered(&self) {
        // ---
        loop {
            // Register before checking so a concurrent trigger is not missed
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }

    /// Spawns a task that sets the flag on the first Ctrl-C.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger_on_ctrl_c(&self) -> JoinHandle<()> {
        // ---
        let flag = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, shutting down");
                    flag.trigger();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_flag_shared_between_clones() {
        // ---
        let flag = ShutdownFlag::new();
        let other = flag.clone();

        assert!(!other.is_triggered());
        flag.trigger();
        assert!(other.is_triggered());

        flag.trigger();
        assert!(flag.is_triggered());
    }

    #[tokio::test]
    async fn test_triggered_wakes_waiter() {
        // ---
        let flag = ShutdownFlag::new();
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.triggered().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        flag.trigger();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter never woke")
            .expect("waiter panicked");
    }

    #[tokio::test]
    async fn test_triggered_returns_immediately_when_set() {
        // ---
        let flag = ShutdownFlag::new();
        flag.trigger();
        flag.triggered().await;
    }
}
