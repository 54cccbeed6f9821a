use super::poller::StatusPoller;
use super::reconciler::Reconciler;
use super::scope::{TeardownReason, ViewScope};
use super::source::SessionBackend;
use crate::config::Config;
use crate::realtime::{RealtimeError, RealtimeSubscriber};
use crate::session::Credentials;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How a monitor polls and where it subscribes.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    /// Realtime channel URL; `None` runs on polling alone.
    pub realtime_url: Option<String>,
    pub connect_timeout: Duration,
}

impl MonitorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.sync.poll_interval_ms),
            realtime_url: config
                .sync
                .realtime_enabled
                .then(|| config.backend.resolved_realtime_url()),
            connect_timeout: Duration::from_millis(config.backend.request_timeout_ms),
        }
    }
}

/// Starts the status poller and the realtime subscriber as one unit.
pub struct ConnectionMonitor;

impl ConnectionMonitor {
    /// Acquire both sources in a fresh scope.
    ///
    /// The channel is only opened when a credential is present; a failed
    /// handshake leaves the poller as the sole source.
    pub async fn start<B: SessionBackend + 'static>(
        backend: Arc<B>,
        credentials: Credentials,
        reconciler: &Reconciler,
        options: MonitorOptions,
    ) -> MonitorHandle {
        let scope = ViewScope::new();
        let writer = reconciler.scoped(scope.clone());
        let mut tasks = Vec::with_capacity(2);

        tasks.push(
            StatusPoller::new(backend, credentials.clone(), options.poll_interval)
                .spawn(writer.clone()),
        );

        match (options.realtime_url, credentials.token()) {
            (Some(url), Some(token)) => {
                let subscriber = RealtimeSubscriber::new(url, options.connect_timeout);
                match subscriber.open(&token, writer).await {
                    Ok(task) => tasks.push(task),
                    Err(RealtimeError::Unauthorized) => credentials.revoke(Some(&scope)),
                    Err(e) => warn!("Realtime channel unavailable, relying on polling: {}", e),
                }
            }
            (Some(_), None) => info!("No session token; realtime channel not opened"),
            (None, _) => info!("Realtime channel disabled; relying on polling"),
        }

        MonitorHandle { scope, tasks }
    }
}

/// The single release handle for a running monitor.
///
/// Dropping it closes the scope as well; [`MonitorHandle::stop`] also waits
/// for both tasks to finish.
pub struct MonitorHandle {
    scope: ViewScope,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Resolves when the monitor shuts down for any reason.
    pub async fn closed(&self) -> TeardownReason {
        self.scope.closed().await
    }

    /// Tear down and wait for the poller and channel to exit.
    ///
    /// Returns the reason the scope closed, which is `Unauthorized` if the
    /// backend had already rejected the credential.
    pub async fn stop(mut self) -> TeardownReason {
        self.scope.close(TeardownReason::Stopped);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Monitor task ended abnormally: {}", e);
            }
        }
        self.scope.reason().unwrap_or(TeardownReason::Stopped)
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.scope.close(TeardownReason::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryTokenStore, TokenStore};
    use crate::sync::source::fake::{status, FakeBackend, Reply};
    use crate::sync::state::ConnectionStatus;
    use std::sync::atomic::Ordering;

    fn polling_only() -> MonitorOptions {
        MonitorOptions {
            poll_interval: Duration::from_secs(2),
            realtime_url: None,
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_polling() {
        let backend = Arc::new(FakeBackend::new(vec![status(ConnectionStatus::Connecting, None)]));
        let reconciler = Reconciler::new();
        let mut reader = reconciler.subscribe();

        let handle = ConnectionMonitor::start(
            backend.clone(),
            Credentials::fixed("tok"),
            &reconciler,
            polling_only(),
        )
        .await;

        assert_eq!(reader.changed().await.unwrap().status, ConnectionStatus::Connecting);
        assert_eq!(handle.stop().await, TeardownReason::Stopped);

        let calls = backend.status_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.status_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_closes_the_scope() {
        let backend = Arc::new(FakeBackend::new(vec![status(ConnectionStatus::Connected, None)]));
        let reconciler = Reconciler::new();

        let handle = ConnectionMonitor::start(
            backend,
            Credentials::fixed("tok"),
            &reconciler,
            polling_only(),
        )
        .await;
        let scope = handle.scope().clone();
        drop(handle);

        assert!(!scope.is_open());
        assert_eq!(scope.closed().await, TeardownReason::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_poll_tears_down_monitor() {
        let store = Arc::new(MemoryTokenStore::new(Some("tok".into())));
        let backend = Arc::new(FakeBackend::new(vec![Reply::Unauthorized]));
        let reconciler = Reconciler::new();

        let handle = ConnectionMonitor::start(
            backend,
            Credentials::new(store.clone()),
            &reconciler,
            polling_only(),
        )
        .await;

        assert_eq!(handle.closed().await, TeardownReason::Unauthorized);
        assert_eq!(handle.stop().await, TeardownReason::Unauthorized);
        assert!(store.load().is_none());
    }

    #[test]
    fn options_follow_config() {
        let mut config = Config::default();
        config.sync.poll_interval_ms = 750;
        let options = MonitorOptions::from_config(&config);
        assert_eq!(options.poll_interval, Duration::from_millis(750));
        assert_eq!(options.realtime_url.as_deref(), Some("ws://localhost:8080/ws"));

        config.sync.realtime_enabled = false;
        assert!(MonitorOptions::from_config(&config).realtime_url.is_none());
    }
}
