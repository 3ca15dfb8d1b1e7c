//! Reload guard
//!
//! Coalescing state machine for reconciliation passes: at most one reload is
//! in flight at a time, and a request arriving during a pass is remembered in
//! a depth-1 pending flag instead of queuing. A burst of N requests while one
//! pass runs therefore completes at most two passes - the one in flight plus
//! one follow-up capturing the latest state. The pending flag is re-checked
//! after every pass, so a request arriving during the follow-up still gets
//! its own pass and no update is ever dropped.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tn_core::{Notifier, TracingNotifier};

/// Observable guard state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No reconciliation pass in flight
    Idle,
    /// A pass is running
    Loading,
}

/// What happened to a reload request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// This call ran the pass (and any follow-ups) to completion
    Completed,
    /// A pass was already in flight; the request was folded into it
    Coalesced,
}

#[derive(Debug, Default)]
struct Flags {
    loading: bool,
    pending: bool,
}

/// The coalescing reload guard
///
/// Failures inside a pass are surfaced once through the injected [`Notifier`]
/// and never leave the guard stuck in the loading state.
pub struct ReloadGuard {
    flags: Mutex<Flags>,
    completed_passes: AtomicU64,
    notifier: Arc<dyn Notifier>,
}

impl ReloadGuard {
    /// Create a guard reporting failures through the given notifier
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            flags: Mutex::new(Flags::default()),
            completed_passes: AtomicU64::new(0),
            notifier,
        }
    }

    fn lock_flags(&self) -> std::sync::MutexGuard<'_, Flags> {
        // a poisoned lock must not leave the guard stuck in Loading
        self.flags
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> GuardState {
        if self.lock_flags().loading {
            GuardState::Loading
        } else {
            GuardState::Idle
        }
    }

    /// Total passes run to completion (successful or failed)
    #[inline]
    #[must_use]
    pub fn completed_passes(&self) -> u64 {
        self.completed_passes.load(Ordering::SeqCst)
    }

    /// Request a reconciliation pass
    ///
    /// If the guard is idle this call runs `reload` (and one follow-up per
    /// pending flag set while it ran) and returns `Completed`. If a pass is
    /// already in flight the pending flag is set and the call returns
    /// `Coalesced` immediately - requests are never queued unboundedly.
    ///
    /// The returned future may be dropped mid-pass (an aborted listener
    /// task); the guard returns to `Idle` in that case as well.
    pub async fn request<F, Fut, E>(&self, reload: F) -> ReloadOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        {
            let mut flags = self.lock_flags();
            if flags.loading {
                flags.pending = true;
                tracing::debug!("reload already in flight, coalescing request");
                return ReloadOutcome::Coalesced;
            }
            flags.loading = true;
        }

        // clears `loading` if this future is dropped at an await point;
        // disarmed on the normal exit path, which releases the flag inside
        // the same critical section as the final pending check
        let mut reset = ResetOnDrop {
            guard: self,
            armed: true,
        };

        loop {
            let result = reload().await;
            self.completed_passes.fetch_add(1, Ordering::SeqCst);

            if let Err(err) = result {
                tracing::warn!(%err, "reconciliation pass failed");
                self.notifier.notify(&format!("Reloading tasks failed: {err}")).await;
            }

            let run_again = {
                let mut flags = self.lock_flags();
                if flags.pending {
                    flags.pending = false;
                    true
                } else {
                    flags.loading = false;
                    false
                }
            };
            if !run_again {
                reset.armed = false;
                return ReloadOutcome::Completed;
            }
        }
    }
}

struct ResetOnDrop<'a> {
    guard: &'a ReloadGuard,
    armed: bool,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.guard.lock_flags().loading = false;
        }
    }
}

impl Default for ReloadGuard {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier))
    }
}
