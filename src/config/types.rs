use super::defaults::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Backend
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// REST base URL of the sales-bot backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix of the WhatsApp session routes.
    #[serde(default = "default_whatsapp_prefix")]
    pub whatsapp_prefix: String,
    /// Realtime channel URL. Derived from `base_url` when unset.
    pub realtime_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl BackendConfig {
    /// The realtime URL to use: explicit, or `base_url` with a WebSocket
    /// scheme and the default realtime path.
    pub fn resolved_realtime_url(&self) -> String {
        if let Some(url) = &self.realtime_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws}{DEFAULT_REALTIME_PATH}")
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            whatsapp_prefix: default_whatsapp_prefix(),
            realtime_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_whatsapp_prefix() -> String {
    DEFAULT_WHATSAPP_PREFIX.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_history_poll_interval_ms")]
    pub history_poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub realtime_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_poll_interval_ms: DEFAULT_HISTORY_POLL_INTERVAL_MS,
            realtime_enabled: true,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_history_poll_interval_ms() -> u64 {
    DEFAULT_HISTORY_POLL_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Where the login flow stores the bearer token.
    /// Defaults to `<stateDir>/token`.
    pub token_file: Option<PathBuf>,
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LoggingLevel,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}
