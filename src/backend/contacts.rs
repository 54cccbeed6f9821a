use super::{ActiveChat, BackendClient, BackendError, BlockRequest, BlockedContact, ChatMessage};

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::info;

/// WhatsApp user JID suffix.
const USER_JID_SUFFIX: &str = "@s.whatsapp.net";

/// Digits only: `"+55 (11) 99999-9999"` → `"5511999999999"`.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Phone digits from either a bare phone number or a user JID.
pub fn phone_from_jid(jid_or_phone: &str) -> String {
    normalize_phone(&jid_or_phone.replace(USER_JID_SUFFIX, ""))
}

impl BackendClient {
    /// Contacts the bot must never answer.
    pub async fn blacklist(&self, token: &str) -> Result<Vec<BlockedContact>, BackendError> {
        self.get_list("/contacts/blacklist", token).await
    }

    /// Chats with recent activity.
    pub async fn active_chats(&self, token: &str) -> Result<Vec<ActiveChat>, BackendError> {
        let path = self.whatsapp_path("/chats");
        self.get_list(&path, token).await
    }

    pub async fn block_contact(
        &self,
        token: &str,
        phone: &str,
        name: &str,
    ) -> Result<(), BackendError> {
        let phone_number = normalize_phone(phone);
        let req = self
            .request(Method::POST, "/contacts/block")?
            .bearer_auth(token)
            .json(&BlockRequest {
                phone_number: &phone_number,
                name,
            });
        self.send(req).await?;
        info!(phone = %phone_number, "Contact blocked");
        Ok(())
    }

    pub async fn unblock_contact(&self, token: &str, jid_or_phone: &str) -> Result<(), BackendError> {
        let phone = phone_from_jid(jid_or_phone);
        let path = format!("/contacts/unblock/{phone}");
        self.send(self.request(Method::DELETE, &path)?.bearer_auth(token))
            .await?;
        info!(phone = %phone, "Contact unblocked");
        Ok(())
    }

    /// Conversation history for one chat.
    pub async fn history(&self, token: &str, jid: &str) -> Result<Vec<ChatMessage>, BackendError> {
        let encoded: String = url::form_urlencoded::byte_serialize(jid.as_bytes()).collect();
        let path = self.whatsapp_path(&format!("/history/{encoded}"));
        self.get_list(&path, token).await
    }

    /// GET a JSON list; anything that is not an array counts as empty.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<Vec<T>, BackendError> {
        let value: serde_json::Value = self.get_json(path, token).await?;
        match value {
            serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client() -> (MockServer, BackendClient) {
        let server = MockServer::start().await;
        let client = BackendClient::new(&BackendConfig {
            base_url: server.uri(),
            ..BackendConfig::default()
        })
        .unwrap();
        (server, client)
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+55 (11) 99999-9999"), "5511999999999");
        assert_eq!(phone_from_jid("5511999999999@s.whatsapp.net"), "5511999999999");
        assert_eq!(phone_from_jid("11 9999"), "119999");
    }

    #[tokio::test]
    async fn block_sends_digits_only() {
        let (server, client) = client().await;
        Mock::given(method("POST"))
            .and(path("/contacts/block"))
            .and(body_json(json!({ "phoneNumber": "5511988887777", "name": "Zé" })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client
            .block_contact("tok", "+55 11 98888-7777", "Zé")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unblock_strips_jid_suffix() {
        let (server, client) = client().await;
        Mock::given(method("DELETE"))
            .and(path("/contacts/unblock/5511988887777"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client
            .unblock_contact("tok", "5511988887777@s.whatsapp.net")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_array_list_is_empty() {
        let (server, client) = client().await;
        Mock::given(method("GET"))
            .and(path("/contacts/blacklist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        assert!(client.blacklist("tok").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_chats_decode() {
        let (server, client) = client().await;
        Mock::given(method("GET"))
            .and(path("/whatsapp/chats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "chatId": "551100@s.whatsapp.net", "updatedAt": "2026-01-02T10:00:00Z" }
            ])))
            .mount(&server)
            .await;

        let chats = client.active_chats("tok").await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].chat_id, "551100@s.whatsapp.net");
    }

    #[tokio::test]
    async fn history_encodes_jid() {
        let (server, client) = client().await;
        Mock::given(method("GET"))
            .and(path("/whatsapp/history/551100%40s.whatsapp.net"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "role": "user", "parts": [{ "text": "Oi" }] }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let history = client.history("tok", "551100@s.whatsapp.net").await.unwrap();
        assert_eq!(history[0].text(), "Oi");
    }
}
