use crate::backend::{QrResponse, StatusResponse};
use crate::sync::state::{Observation, ObservationSource};

use serde::{Deserialize, Serialize};

/// Event carrying `{status, id?}`.
pub const STATUS_EVENT: &str = "status";

/// Event carrying `{qrCode}`.
pub const QR_CODE_EVENT: &str = "qr-code";

/// Wire frame pushed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A recognised inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Status(StatusResponse),
    PairingCode(QrResponse),
}

impl ChannelEvent {
    pub fn into_observation(self) -> Observation {
        match self {
            Self::Status(s) => Observation::status(ObservationSource::Push, s.status, s.id),
            Self::PairingCode(qr) => Observation::artifact(ObservationSource::Push, qr.qr_code),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event '{0}' has no payload")]
    MissingData(String),
}

/// Parse one text frame.
///
/// `Ok(None)` means the frame was well formed but names an event this client
/// does not consume.
pub fn parse_frame(text: &str) -> Result<Option<ChannelEvent>, FrameError> {
    let frame: EventFrame = serde_json::from_str(text)?;

    let decode = |data: Option<serde_json::Value>| {
        data.ok_or_else(|| FrameError::MissingData(frame.event.clone()))
    };

    let event = match frame.event.as_str() {
        STATUS_EVENT => ChannelEvent::Status(serde_json::from_value(decode(frame.data.clone())?)?),
        QR_CODE_EVENT => {
            ChannelEvent::PairingCode(serde_json::from_value(decode(frame.data.clone())?)?)
        }
        _ => return Ok(None),
    };

    Ok(Some(event))
}
