use std::sync::{Mutex, MutexGuard};
use tokio::task::AbortHandle;

/// Lock acquisition that survives a poisoned mutex.
pub(crate) trait MutexExt<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    #[track_caller]
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    mutex_type = std::any::type_name::<T>(),
                    file = loc.file(),
                    line = loc.line(),
                    "Mutex poisoned, recovering inner state"
                );
                poisoned.into_inner()
            }
        }
    }
}

/// Single-flight marker for one class of operation.
///
/// `active` and `handle` always describe the same request. Every `begin` hands
/// out a fresh ticket; a completion whose ticket is no longer current is stale
/// and must not touch shared state.
#[derive(Debug, Default)]
pub struct InFlightGuard {
    active: bool,
    handle: Option<AbortHandle>,
    ticket: u64,
}

impl InFlightGuard {
    pub fn is_busy(&self) -> bool {
        self.active || self.handle.is_some()
    }

    pub fn begin(&mut self) -> u64 {
        self.active = true;
        self.ticket = self.ticket.wrapping_add(1);
        self.ticket
    }

    /// Records the task serving `ticket`. A handle for an outdated ticket is aborted.
    pub fn attach(&mut self, ticket: u64, handle: AbortHandle) {
        if self.active && self.ticket == ticket {
            self.handle = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Clears the guard when `ticket` is still current. Returns whether it was.
    pub fn finish(&mut self, ticket: u64) -> bool {
        if !self.active || self.ticket != ticket {
            return false;
        }
        self.active = false;
        self.handle = None;
        true
    }

    /// Aborts the current request (best effort) and invalidates its ticket.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.active = false;
        self.ticket = self.ticket.wrapping_add(1);
    }
}

/// Runs `release` when dropped, including while a panic unwinds or an aborted
/// task is torn down. Request tasks hold one so their guard never outlives them.
pub(crate) struct ReleaseOnDrop<F: FnOnce()> {
    release: Option<F>,
}

impl<F: FnOnce()> ReleaseOnDrop<F> {
    pub(crate) fn new(release: F) -> Self {
        Self {
            release: Some(release),
        }
    }
}

impl<F: FnOnce()> Drop for ReleaseOnDrop<F> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
