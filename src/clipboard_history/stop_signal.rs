//! One-shot cancellation for the monitor thread
//!
//! A flag plus a condition variable: the monitor checks the flag before each
//! tick and sleeps on the condvar between ticks, so `cancel()` wakes it at once
//! instead of waiting out the poll interval.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Clonable handle to a shared cancellation flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Calling it again has no further effect.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.inner.wake.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for up to `timeout`, returning early if cancelled.
    ///
    /// Returns `true` if cancellation has been signalled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self.inner.wake.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}
