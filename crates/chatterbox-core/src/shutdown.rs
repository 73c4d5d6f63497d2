//! Cooperative shutdown
//!
//! One process-wide flag, written at most once. Workers poll it at the top
//! of every iteration and also await it during their pause, so a stop
//! request is observed no later than the end of the current pause. Nothing
//! is ever aborted: a worker holding the switchboard lock finishes its step
//! before it looks at the flag again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::info;

#[derive(Debug, Default)]
struct ShutdownInner {
    stop_requested: AtomicBool,
    notify: Notify,
}

/// Cloneable handle to the run's stop flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<ShutdownInner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker to stop.
    ///
    /// Returns `true` for the call that actually flipped the flag.
    pub fn request_stop(&self) -> bool {
        if self.inner.stop_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        info!("🛑 Stop requested, waiting for workers to wind down");
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop_requested.load(Ordering::SeqCst)
    }

    /// Resolve once a stop has been requested
    pub async fn stopped(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent request is not missed.
        notified.as_mut().enable();
        if self.is_stop_requested() {
            return;
        }
        notified.await;
    }
}
