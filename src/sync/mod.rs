//! Connection state synchronization.
//!
//! Two racing sources describe the same backend session: the REST
//! [`StatusPoller`] and the realtime channel. Both feed observations through
//! a [`ScopedWriter`] into the [`Reconciler`], which owns the one merged
//! [`ConnectionState`] that readers subscribe to.

pub mod controller;
pub mod history;
pub mod monitor;
pub mod poller;
pub mod reconciler;
pub mod scope;
pub mod source;
pub mod state;

pub use controller::{BotConnectionController, PairingError};
pub use history::ChatHistoryPoller;
pub use monitor::{ConnectionMonitor, MonitorHandle, MonitorOptions};
pub use poller::StatusPoller;
pub use reconciler::{Reconciler, ScopedWriter, StateReader};
pub use scope::{TeardownReason, ViewScope};
pub use source::SessionBackend;
pub use state::{ConnectionState, ConnectionStatus, Observation, ObservationSource};
