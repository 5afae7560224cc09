//! Cancellation of in-flight sync units.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared handle to one unit of work.
///
/// Cloning is cheap; every clone observes the same cancellation and
/// completion state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancel_tx: Arc<watch::Sender<bool>>,
    done_rx: watch::Receiver<bool>,
}

/// Held by the running unit; marks it finished when dropped.
#[derive(Debug)]
pub struct FinishGuard {
    done_tx: watch::Sender<bool>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.done_tx.send_replace(true);
    }
}

impl CancelToken {
    pub fn new() -> (CancelToken, FinishGuard) {
        let (cancel_tx, _) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        let token = CancelToken {
            cancel_tx: Arc::new(cancel_tx),
            done_rx,
        };
        (token, FinishGuard { done_tx })
    }

    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    pub fn is_finished(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_tx.subscribe();
        // The sender lives as long as `self`
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Resolves once the unit's [`FinishGuard`] is gone.
    pub async fn finished(&self) {
        let mut rx = self.done_rx.clone();
        // A dropped sender also means the guard is gone
        let _ = rx.wait_for(|done| *done).await;
    }
}
