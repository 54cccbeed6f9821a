use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Connection Status
// ============================================================================

/// Connection status of the bot's WhatsApp session as reported by the backend.
///
/// The wire form is the SCREAMING_SNAKE_CASE name (`"QR_CODE_READY"` etc).
/// Anything outside these five values fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connecting,
    QrCodeReady,
    Connected,
    Disconnected,
    Offline,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::QrCodeReady => "QR_CODE_READY",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::Offline => "OFFLINE",
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECTING" => Ok(Self::Connecting),
            "QR_CODE_READY" => Ok(Self::QrCodeReady),
            "CONNECTED" => Ok(Self::Connected),
            "DISCONNECTED" => Ok(Self::Disconnected),
            "OFFLINE" => Ok(Self::Offline),
            other => Err(format!("unknown connection status: {other}")),
        }
    }
}

// ============================================================================
// Observations
// ============================================================================

/// Where an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationSource {
    /// The REST status poller.
    Poll,
    /// The realtime event channel.
    Push,
}

/// One reported `{status, identity?, artifact?}` tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub status: ConnectionStatus,
    pub identity: Option<String>,
    pub artifact: Option<String>,
    pub source: ObservationSource,
}

impl Observation {
    /// A plain status report, optionally carrying the connected identity.
    pub fn status(
        source: ObservationSource,
        status: ConnectionStatus,
        identity: Option<String>,
    ) -> Self {
        Self {
            status,
            identity,
            artifact: None,
            source,
        }
    }

    /// A fresh pairing artifact. Always implies `QR_CODE_READY`.
    pub fn artifact(source: ObservationSource, artifact: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::QrCodeReady,
            identity: None,
            artifact: Some(artifact.into()),
            source,
        }
    }

    /// What the poller reports when the backend cannot be reached.
    pub fn offline() -> Self {
        Self::status(ObservationSource::Poll, ConnectionStatus::Offline, None)
    }

    /// Attach an artifact fetched alongside a status report.
    pub fn with_artifact(mut self, artifact: Option<String>) -> Self {
        self.artifact = artifact;
        self
    }

    /// The status this observation actually asserts.
    pub fn effective_status(&self) -> ConnectionStatus {
        if self.artifact.is_some() {
            ConnectionStatus::QrCodeReady
        } else {
            self.status
        }
    }
}

// ============================================================================
// Reconciled State
// ============================================================================

/// Immutable snapshot of the reconciled connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub pairing_artifact: Option<String>,
    pub connected_identity: Option<String>,
}

impl ConnectionState {
    /// Merge one observation into this snapshot and return the result.
    ///
    /// Last writer wins per field; the artifact only survives in
    /// `QR_CODE_READY` and the identity only in `CONNECTED`.
    pub fn apply(&self, obs: &Observation) -> ConnectionState {
        let status = obs.effective_status();

        let pairing_artifact = match status {
            ConnectionStatus::QrCodeReady => obs
                .artifact
                .clone()
                .or_else(|| self.pairing_artifact.clone()),
            _ => None,
        };

        let connected_identity = match status {
            ConnectionStatus::Connected => obs.identity.clone(),
            _ => None,
        };

        ConnectionState {
            status,
            pairing_artifact,
            connected_identity,
        }
    }

    /// The account part of the connected identity (`5511...@s.whatsapp.net` → `5511...`).
    pub fn display_identity(&self) -> Option<&str> {
        self.connected_identity
            .as_deref()
            .map(|id| id.split('@').next().unwrap_or(id))
    }
}
