//! HTTP client for the sales-bot backend.
//!
//! Every call except login carries the session bearer token. A 401 from any
//! endpoint is reported as [`BackendError::Unauthorized`] so callers can
//! escalate it instead of retrying.

mod contacts;
mod types;

pub use contacts::*;
pub use types::*;

use crate::config::BackendConfig;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend rejected the session credential")]
    Unauthorized,
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

// ============================================================================
// Client
// ============================================================================

/// Thin typed wrapper over the backend's REST surface.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    whatsapp_prefix: String,
    client: Client,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        // Fail early on a bad base URL rather than on the first request.
        Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            whatsapp_prefix: config.whatsapp_prefix.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Current WhatsApp session status.
    pub async fn status(&self, token: &str) -> Result<StatusResponse, BackendError> {
        let path = format!("{}/status", self.whatsapp_prefix);
        self.get_json(&path, token).await
    }

    /// Current pairing code. Also asks the backend to start a pairing cycle
    /// if none is running.
    pub async fn pairing_code(&self, token: &str) -> Result<QrResponse, BackendError> {
        let path = format!("{}/qr", self.whatsapp_prefix);
        self.get_json(&path, token).await
    }

    /// Begin a pairing cycle. The resulting status arrives through the
    /// poller or the realtime channel, not through this call.
    pub async fn begin_pairing(&self, token: &str) -> Result<(), BackendError> {
        let path = format!("{}/qr", self.whatsapp_prefix);
        self.send(self.request(Method::GET, &path)?.bearer_auth(token))
            .await?;
        Ok(())
    }

    /// Exchange operator credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let req = self
            .request(Method::POST, "/auth/login")?
            .json(&LoginRequest { email, password });
        let resp = self.send(req).await?;
        Ok(resp.json().await?)
    }

    /// Create a consultant account. The response body is not used; log in
    /// afterwards to obtain a token.
    pub async fn register_consultant(
        &self,
        name: &str,
        email: &str,
        number: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let req = self
            .request(Method::POST, "/auth/register-consultant")?
            .json(&RegisterRequest {
                name,
                email,
                number: normalize_phone(number),
                password,
            });
        self.send(req).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    pub(crate) fn whatsapp_path(&self, suffix: &str) -> String {
        format!("{}{}", self.whatsapp_prefix, suffix)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let url = Url::parse(&format!("{}{}", self.base_url, path))?;
        debug!(%method, %url, "Backend request");
        Ok(self.client.request(method, url))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, BackendError> {
        let resp = self
            .send(self.request(Method::GET, path)?.bearer_auth(token))
            .await?;
        Ok(resp.json().await?)
    }

    /// Send and classify the response status.
    pub(crate) async fn send(&self, req: RequestBuilder) -> Result<Response, BackendError> {
        let resp = req.send().await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.first_message())
                .unwrap_or(text);
            return Err(BackendError::Status { status, body });
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: server.uri(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = BackendClient::new(&BackendConfig {
            base_url: "not a url".to_string(),
            ..BackendConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, BackendError::Url(_)));
    }

    #[tokio::test]
    async fn status_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whatsapp/status"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "CONNECTED",
                "id": "551199@s.whatsapp.net"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server).status("tok").await.unwrap();
        assert_eq!(resp.status, crate::sync::state::ConnectionStatus::Connected);
        assert_eq!(resp.id.as_deref(), Some("551199@s.whatsapp.net"));
    }

    #[tokio::test]
    async fn unauthorized_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whatsapp/qr"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).pairing_code("stale").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn login_surfaces_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({ "email": "a@b.c", "password": "nope" })))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "message": ["password too short"] })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).login("a@b.c", "nope").await.unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "password too short");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_sends_digits_only_number() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register-consultant"))
            .and(body_json(json!({
                "name": "Ana",
                "email": "ana@example.com",
                "number": "5511999990000",
                "password": "s3cret"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .register_consultant("Ana", "ana@example.com", "+55 (11) 99999-0000", "s3cret")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn register_surfaces_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register-consultant"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({ "message": "Email already in use" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .register_consultant("Ana", "ana@example.com", "11 9999", "pw")
            .await
            .unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(body, "Email already in use");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "access_token": "jwt",
                "user": { "name": "Ana" }
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server).login("a@b.c", "pw").await.unwrap();
        assert_eq!(resp.access_token, "jwt");
        assert_eq!(resp.user.and_then(|u| u.name).as_deref(), Some("Ana"));
    }
}
