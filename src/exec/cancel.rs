//! Caller-side cancellation for in-flight executions.
//!
//! One pair per cancellable call: the handle stays with the caller, the
//! token travels into the executor. Firing the handle aborts that call's
//! in-flight wait (network or backoff) and surfaces `Cancelled`; other
//! executions are unaffected.

use tokio::sync::watch;

/// Caller-held side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fire the signal. Idempotent; late calls after completion are no-ops.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Executor-held side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token that can never fire, for calls without a caller-side handle.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow(),
            None => false,
        }
    }

    /// Resolve when the signal fires. Pends forever for `never()` tokens or
    /// when the handle is dropped without firing.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending::<()>().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without firing: cancellation can no longer happen.
                return std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx: Some(rx) })
}
