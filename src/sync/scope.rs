//! Teardown lifecycle shared by everything a monitored view owns.
//!
//! A `ViewScope` is opened when a view starts watching the backend and closed
//! exactly once, either because the view went away or because the backend
//! rejected the session credential. Pollers and channels `select!` on
//! [`ViewScope::closed`] and every write into shared state checks
//! [`ViewScope::is_open`] first.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Why a scope was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// The owner stopped or dropped the view.
    Stopped,
    /// The backend rejected the credential; the session is gone.
    Unauthorized,
}

/// Clone-cheap handle onto one view's lifetime.
#[derive(Debug, Clone)]
pub struct ViewScope {
    inner: Arc<ScopeInner>,
}

#[derive(Debug)]
struct ScopeInner {
    closed: AtomicBool,
    reason: Mutex<Option<TeardownReason>>,
    notify: Notify,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                closed: AtomicBool::new(false),
                reason: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Close the scope. Only the first call records its reason.
    ///
    /// Returns `true` if this call performed the close.
    pub fn close(&self, reason: TeardownReason) -> bool {
        {
            let mut slot = self.inner.reason.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
        }
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<TeardownReason> {
        *self.inner.reason.lock()
    }

    /// Wait until the scope closes and return why.
    ///
    /// Returns immediately if the scope is already closed.
    pub async fn closed(&self) -> TeardownReason {
        loop {
            // Register before checking the flag so a close between the two
            // cannot be missed.
            let notified = self.inner.notify.notified();
            if let Some(reason) = self.reason() {
                return reason;
            }
            notified.await;
        }
    }

    /// Run `task` until it finishes or the scope closes, whichever is first.
    pub async fn run_until_closed<T, F>(&self, task: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            result = task => Some(result),
            _ = self.closed() => None,
        }
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}
