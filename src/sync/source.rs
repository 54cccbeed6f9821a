use crate::backend::{BackendClient, BackendError, ChatMessage, QrResponse, StatusResponse};

use async_trait::async_trait;

/// The slice of the backend the synchronizer talks to.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn status(&self, token: &str) -> Result<StatusResponse, BackendError>;

    async fn pairing_code(&self, token: &str) -> Result<QrResponse, BackendError>;

    async fn begin_pairing(&self, token: &str) -> Result<(), BackendError>;

    async fn history(&self, token: &str, jid: &str) -> Result<Vec<ChatMessage>, BackendError>;
}

#[async_trait]
impl SessionBackend for BackendClient {
    async fn status(&self, token: &str) -> Result<StatusResponse, BackendError> {
        BackendClient::status(self, token).await
    }

    async fn pairing_code(&self, token: &str) -> Result<QrResponse, BackendError> {
        BackendClient::pairing_code(self, token).await
    }

    async fn begin_pairing(&self, token: &str) -> Result<(), BackendError> {
        BackendClient::begin_pairing(self, token).await
    }

    async fn history(&self, token: &str, jid: &str) -> Result<Vec<ChatMessage>, BackendError> {
        BackendClient::history(self, token, jid).await
    }
}
