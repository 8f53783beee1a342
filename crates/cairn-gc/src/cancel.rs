//! Cooperative cancellation for collection runs.
//!
//! A collection run suspends in several places: acquiring the store lock,
//! reading the key enumeration, writing to its output streams, and inside
//! link resolution. The [`CancelToken`] is observable at every one of those
//! points; the [`CancelHandle`] fires it at most once.
//!
//! Dropping the handle without firing does **not** cancel: a token whose
//! handle is gone simply can never be cancelled, and [`CancelToken::cancelled`]
//! pends forever. This keeps fire-and-forget callers from tearing down a run
//! by accident.

use tokio::sync::watch;

/// Creates a linked cancellation handle and token.
#[must_use]
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Fires cancellation for the tokens linked to it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels all linked tokens. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observes cancellation. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Returns true if cancellation has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation fires.
    ///
    /// Resolves immediately if cancellation already fired. If the handle was
    /// dropped without firing, this future never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle gone, never fired: cancellation can no longer happen.
            std::future::pending::<()>().await;
        }
    }
}
