//! Bounded-wait mutual exclusion for shared session state.
//!
//! Every critical section in the engine acquires through a `SyncGate`,
//! which waits at most `GATE_WAIT` for the lock. A timed-out acquisition
//! is a recoverable failure the caller must handle; protected state is
//! never touched without a guard.

use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

/// Default bounded wait for a critical section.
pub const GATE_WAIT: Duration = Duration::from_millis(100);

/// Lock acquisition exceeded the bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out waiting for shared state lock")]
pub struct GateTimeout;

/// A mutex whose acquisition is fallible with a bounded wait.
#[derive(Debug)]
pub struct SyncGate<T> {
    inner: Mutex<T>,
    wait: Duration,
}

impl<T> SyncGate<T> {
    pub fn new(value: T) -> Self {
        Self::with_wait(value, GATE_WAIT)
    }

    pub fn with_wait(value: T, wait: Duration) -> Self {
        Self {
            inner: Mutex::new(value),
            wait,
        }
    }

    /// Acquire the gate, waiting at most the configured bound.
    pub fn lock(&self) -> Result<MutexGuard<'_, T>, GateTimeout> {
        self.inner.try_lock_for(self.wait).ok_or(GateTimeout)
    }
}
