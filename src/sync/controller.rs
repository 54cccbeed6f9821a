use super::scope::ViewScope;
use super::source::SessionBackend;
use crate::backend::BackendError;
use crate::session::Credentials;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("no session token; log in first")]
    NoCredential,
    #[error("a pairing request is already in flight")]
    InFlight,
    #[error("pairing request failed: {0}")]
    Backend(#[from] BackendError),
}

/// Issues the "begin pairing" command.
///
/// Never touches reconciled state: the resulting `CONNECTING` /
/// `QR_CODE_READY` transition arrives through the poller or the channel.
pub struct BotConnectionController<B> {
    backend: Arc<B>,
    credentials: Credentials,
    scope: Option<ViewScope>,
    in_flight: AtomicBool,
}

impl<B: SessionBackend> BotConnectionController<B> {
    pub fn new(backend: Arc<B>, credentials: Credentials) -> Self {
        Self {
            backend,
            credentials,
            scope: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Close `scope` too if the backend rejects the credential.
    pub fn with_scope(mut self, scope: ViewScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Whether a request is currently outstanding (for disabling the button).
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn request_pairing(&self) -> Result<(), PairingError> {
        let token = self.credentials.token().ok_or(PairingError::NoCredential)?;
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(PairingError::InFlight)?;

        info!("Requesting a new pairing cycle");
        match self.backend.begin_pairing(&token).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_unauthorized() {
                    self.credentials.revoke(self.scope.as_ref());
                } else {
                    warn!("Pairing request failed: {}", e);
                }
                Err(e.into())
            }
        }
    }
}

/// Holds the in-flight flag; clears it on every exit path, including the
/// caller dropping the request future.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryTokenStore, TokenStore};
    use crate::sync::reconciler::Reconciler;
    use crate::sync::scope::TeardownReason;
    use crate::sync::source::fake::{FakeBackend, Reply};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn success_leaves_state_alone() {
        let reconciler = Reconciler::new();
        let controller = BotConnectionController::new(
            Arc::new(FakeBackend::new(vec![])),
            Credentials::fixed("tok"),
        );

        controller.request_pairing().await.unwrap();
        assert!(!controller.is_in_flight());
        assert_eq!(reconciler.snapshot(), Default::default());
    }

    #[tokio::test]
    async fn rejection_is_reported() {
        let controller = BotConnectionController::new(
            Arc::new(FakeBackend::new(vec![]).with_pairing(vec![Reply::Down])),
            Credentials::fixed("tok"),
        );

        let err = controller.request_pairing().await.unwrap_err();
        assert!(matches!(err, PairingError::Backend(_)));
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn no_token_is_rejected_without_request() {
        let backend = Arc::new(FakeBackend::new(vec![]));
        let controller = BotConnectionController::new(
            backend.clone(),
            Credentials::new(Arc::new(MemoryTokenStore::new(None))),
        );

        assert!(matches!(
            controller.request_pairing().await,
            Err(PairingError::NoCredential)
        ));
        assert_eq!(backend.pairing_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_request_is_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend::new(vec![]).gated(gate.clone()));
        let controller = Arc::new(BotConnectionController::new(
            backend.clone(),
            Credentials::fixed("tok"),
        ));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.request_pairing().await })
        };
        while backend.pairing_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(controller.is_in_flight());
        assert!(matches!(
            controller.request_pairing().await,
            Err(PairingError::InFlight)
        ));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn unauthorized_revokes_credential() {
        let store = Arc::new(MemoryTokenStore::new(Some("tok".into())));
        let scope = ViewScope::new();
        let controller = BotConnectionController::new(
            Arc::new(FakeBackend::new(vec![]).with_pairing(vec![Reply::Unauthorized])),
            Credentials::new(store.clone()),
        )
        .with_scope(scope.clone());

        let err = controller.request_pairing().await.unwrap_err();
        assert!(matches!(err, PairingError::Backend(BackendError::Unauthorized)));
        assert!(store.load().is_none());
        assert_eq!(scope.reason(), Some(TeardownReason::Unauthorized));
    }
}
