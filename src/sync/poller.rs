use super::reconciler::ScopedWriter;
use super::scope::ViewScope;
use super::source::SessionBackend;
use super::state::{ConnectionStatus, Observation, ObservationSource};
use crate::session::Credentials;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest period a poller will tick at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Interval ticker shared by the pollers: immediate first tick, missed ticks
/// skipped, period floored at [`MIN_POLL_INTERVAL`].
pub(crate) fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Periodic REST status check: the fallback and initial-state source.
pub struct StatusPoller<B> {
    backend: Arc<B>,
    credentials: Credentials,
    interval: Duration,
}

impl<B: SessionBackend + 'static> StatusPoller<B> {
    pub fn new(backend: Arc<B>, credentials: Credentials, interval: Duration) -> Self {
        Self {
            backend,
            credentials,
            interval,
        }
    }

    /// Run one poll and return the observation it produced.
    ///
    /// `None` means nothing should be applied: no credential is stored, or
    /// the credential was rejected and `scope` has been closed.
    pub async fn poll_once(&self, scope: &ViewScope) -> Option<Observation> {
        let Some(token) = self.credentials.token() else {
            debug!("No session token; skipping status poll");
            return None;
        };

        let resp = match self.backend.status(&token).await {
            Ok(resp) => resp,
            Err(e) if e.is_unauthorized() => {
                self.credentials.revoke(Some(scope));
                return None;
            }
            Err(e) => {
                warn!("Status poll failed: {}", e);
                return Some(Observation::offline());
            }
        };

        debug!(status = %resp.status, "Status poll");
        let obs = Observation::status(ObservationSource::Poll, resp.status, resp.id);
        if resp.status != ConnectionStatus::QrCodeReady {
            return Some(obs);
        }

        match self.backend.pairing_code(&token).await {
            Ok(qr) => Some(obs.with_artifact(Some(qr.qr_code))),
            Err(e) if e.is_unauthorized() => {
                self.credentials.revoke(Some(scope));
                None
            }
            Err(e) => {
                warn!("Failed to fetch pairing code: {}", e);
                Some(obs)
            }
        }
    }

    /// Poll until the writer's scope closes. The first poll is immediate.
    pub async fn run(self, writer: ScopedWriter) {
        let scope = writer.scope().clone();
        let mut ticker = ticker(self.interval);

        info!(
            interval_ms = ticker.period().as_millis() as u64,
            "Status poller started"
        );
        loop {
            let tick = scope
                .run_until_closed(async {
                    ticker.tick().await;
                    self.poll_once(&scope).await
                })
                .await;

            match tick {
                None => break,
                Some(Some(obs)) => {
                    writer.apply(&obs);
                }
                Some(None) => {}
            }
        }
        debug!("Status poller stopped");
    }

    pub fn spawn(self, writer: ScopedWriter) -> JoinHandle<()> {
        tokio::spawn(self.run(writer))
    }
}
