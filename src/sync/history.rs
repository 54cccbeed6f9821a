use super::poller::ticker;
use super::scope::ViewScope;
use super::source::SessionBackend;
use crate::backend::ChatMessage;
use crate::session::Credentials;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Keeps one chat's history fresh while it is open in a view.
pub struct ChatHistoryPoller<B> {
    backend: Arc<B>,
    credentials: Credentials,
    interval: Duration,
}

impl<B: SessionBackend + 'static> ChatHistoryPoller<B> {
    pub fn new(backend: Arc<B>, credentials: Credentials, interval: Duration) -> Self {
        Self {
            backend,
            credentials,
            interval,
        }
    }

    /// Start polling `jid` until `scope` closes.
    ///
    /// The receiver starts empty and holds the latest successfully fetched
    /// history; failed fetches keep the previous value.
    pub fn spawn(
        self,
        jid: String,
        scope: ViewScope,
    ) -> (JoinHandle<()>, watch::Receiver<Vec<ChatMessage>>) {
        let (tx, rx) = watch::channel(Vec::new());
        let task = tokio::spawn(self.run(jid, scope, tx));
        (task, rx)
    }

    async fn run(self, jid: String, scope: ViewScope, tx: watch::Sender<Vec<ChatMessage>>) {
        let mut ticker = ticker(self.interval);

        loop {
            let fetched = scope
                .run_until_closed(async {
                    ticker.tick().await;
                    self.fetch(&jid, &scope).await
                })
                .await;

            let Some(fetched) = fetched else { break };
            let Some(messages) = fetched else { continue };

            if !scope.is_open() {
                break;
            }
            tx.send_if_modified(|current| {
                if *current == messages {
                    return false;
                }
                *current = messages;
                true
            });
        }
        debug!(jid = %jid, "Chat history poller stopped");
    }

    async fn fetch(&self, jid: &str, scope: &ViewScope) -> Option<Vec<ChatMessage>> {
        let token = self.credentials.token()?;
        match self.backend.history(&token, jid).await {
            Ok(messages) => Some(messages),
            Err(e) if e.is_unauthorized() => {
                self.credentials.revoke(Some(scope));
                None
            }
            Err(e) => {
                warn!(jid = %jid, "Failed to fetch chat history: {}", e);
                None
            }
        }
    }
}
