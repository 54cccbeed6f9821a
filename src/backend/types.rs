use crate::sync::state::ConnectionStatus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// WhatsApp Session
// ============================================================================

/// `GET {prefix}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ConnectionStatus,
    #[serde(default)]
    pub id: Option<String>,
}

/// `GET {prefix}/qr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub qr_code: String,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/register-consultant`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    /// Digits only.
    pub number: String,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub name: Option<String>,
}

/// Error body returned by the backend framework: `message` is either a string
/// or a list of validation messages.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    message: serde_json::Value,
}

impl ErrorBody {
    pub(crate) fn first_message(&self) -> Option<String> {
        match &self.message {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => {
                items.iter().find_map(|v| v.as_str()).map(String::from)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Contacts & Chats
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedContact {
    pub jid: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChat {
    pub chat_id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest<'a> {
    pub phone_number: &'a str,
    pub name: &'a str,
}

/// Who authored a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The customer.
    User,
    /// The bot's AI.
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// All text parts joined with newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
