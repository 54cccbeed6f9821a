use super::scope::ViewScope;
use super::state::{ConnectionState, Observation};

use tokio::sync::watch;
use tracing::{debug, info};

/// The single owner of the reconciled connection state.
///
/// All writes go through [`Reconciler::apply`]; readers get a
/// [`StateReader`] and cannot mutate anything.
#[derive(Debug)]
pub struct Reconciler {
    tx: watch::Sender<ConnectionState>,
}

impl Reconciler {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::default());
        Self { tx }
    }

    /// Merge an observation. Returns `true` if the reconciled state changed.
    pub fn apply(&self, obs: &Observation) -> bool {
        merge(&self.tx, obs, None)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ConnectionState {
        self.tx.borrow().clone()
    }

    /// A read-only subscription to state changes.
    pub fn subscribe(&self) -> StateReader {
        StateReader {
            rx: self.tx.subscribe(),
        }
    }

    /// A write handle that stops writing once `scope` closes.
    pub fn scoped(&self, scope: ViewScope) -> ScopedWriter {
        ScopedWriter {
            tx: self.tx.clone(),
            scope,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the reconciled state.
#[derive(Debug, Clone)]
pub struct StateReader {
    rx: watch::Receiver<ConnectionState>,
}

impl StateReader {
    pub fn current(&self) -> ConnectionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new snapshot.
    ///
    /// Returns `None` once the reconciler has been dropped.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Whether a change arrived that has not been read yet.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

/// Write path handed to the poller and the realtime subscriber.
///
/// Shares the reconciler's merge function but refuses to write once the
/// owning view's scope has closed.
#[derive(Debug, Clone)]
pub struct ScopedWriter {
    tx: watch::Sender<ConnectionState>,
    scope: ViewScope,
}

impl ScopedWriter {
    /// Apply an observation if the scope is still open.
    ///
    /// Returns `true` only if the state actually changed.
    pub fn apply(&self, obs: &Observation) -> bool {
        merge(&self.tx, obs, Some(&self.scope))
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }
}

/// The one place reconciled state is written.
///
/// The scope is checked while the channel's write lock is held, so a writer
/// never commits after observing its scope closed.
fn merge(
    tx: &watch::Sender<ConnectionState>,
    obs: &Observation,
    scope: Option<&ViewScope>,
) -> bool {
    tx.send_if_modified(|state| {
        if scope.is_some_and(|s| !s.is_open()) {
            debug!(source = ?obs.source, "Dropping observation after teardown");
            return false;
        }
        let next = state.apply(obs);
        if next == *state {
            debug!(source = ?obs.source, status = %obs.status, "Observation left state unchanged");
            return false;
        }
        if next.status != state.status {
            info!(
                from = %state.status,
                to = %next.status,
                source = ?obs.source,
                "Connection status changed"
            );
        }
        *state = next;
        true
    })
}
