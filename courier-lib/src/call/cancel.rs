use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cooperative cancellation flag shared by a call and its chain.
///
/// Setting the flag never interrupts anything by itself. Stages observe it
/// at checkpoints with [`Cancellation::is_canceled`], or race blocking work
/// against [`Cancellation::cancelled`].
#[derive(Debug, Default)]
pub(crate) struct Cancellation {
    canceled: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    /// Set the flag and wake every waiter. Returns `true` on the first call only.
    pub(crate) fn cancel(&self) -> bool {
        let first = !self.canceled.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Resolves once the flag is set
    pub(crate) async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent `cancel` cannot slip in between.
            let notified = self.notify.notified();
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let cancellation = Cancellation::default();
        assert!(!cancellation.is_canceled());
        assert!(cancellation.cancel());
        assert!(!cancellation.cancel());
        assert!(!cancellation.cancel());
        assert!(cancellation.is_canceled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_set() {
        let cancellation = Cancellation::default();
        cancellation.cancel();
        tokio::time::timeout(Duration::from_millis(100), cancellation.cancelled())
            .await
            .expect("already canceled");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let cancellation = Arc::new(Cancellation::default());
        let waiter = tokio::spawn({
            let cancellation = Arc::clone(&cancellation);
            async move { cancellation.cancelled().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancellation.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woken")
            .unwrap();
    }
}
