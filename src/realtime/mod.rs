//! Realtime event channel.
//!
//! One authenticated WebSocket per monitored view. Inbound frames become
//! `push` observations; the channel is never reopened automatically and is
//! closed with a close frame when the view's scope closes.

pub mod protocol;

pub use protocol::*;

use crate::sync::reconciler::ScopedWriter;

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, http::StatusCode, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

type ChannelStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("realtime channel rejected the session credential")]
    Unauthorized,
    #[error("realtime handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
    #[error("realtime handshake timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid realtime url: {0}")]
    Url(#[from] url::ParseError),
}

/// Channel URL with the credential attached as the `token` query parameter.
pub fn channel_url(base: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Opens the realtime channel and feeds it into the reconciler.
#[derive(Debug, Clone)]
pub struct RealtimeSubscriber {
    url: String,
    connect_timeout: Duration,
}

impl RealtimeSubscriber {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    /// Complete the handshake and spawn the reader.
    ///
    /// The returned task ends when the writer's scope closes (after sending
    /// a close frame) or when the backend drops the channel.
    pub async fn open(
        &self,
        token: &str,
        writer: ScopedWriter,
    ) -> Result<JoinHandle<()>, RealtimeError> {
        let url = channel_url(&self.url, token)?;

        info!("Opening realtime channel at {}", self.url);
        let handshake = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| RealtimeError::Timeout(self.connect_timeout))?;

        let (stream, _) = match handshake {
            Ok(ok) => ok,
            Err(tungstenite::Error::Http(resp)) if resp.status() == StatusCode::UNAUTHORIZED => {
                return Err(RealtimeError::Unauthorized);
            }
            Err(e) => return Err(e.into()),
        };

        info!("Realtime channel open");
        Ok(tokio::spawn(run_channel(stream, writer)))
    }
}

async fn run_channel(stream: ChannelStream, writer: ScopedWriter) {
    let scope = writer.scope().clone();
    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            biased;

            _ = scope.closed() => {
                if let Err(e) = ws_tx.send(Message::Close(None)).await {
                    debug!("Realtime close frame not delivered: {}", e);
                }
                info!("Realtime channel closed");
                return;
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => handle_text(&text, &writer),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    warn!(reason = %reason, "Realtime channel closed by backend; relying on polling");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Realtime channel error: {}; relying on polling", e);
                    return;
                }
                None => {
                    warn!("Realtime channel dropped; relying on polling");
                    return;
                }
            },
        }
    }
}

fn handle_text(text: &str, writer: &ScopedWriter) {
    match parse_frame(text) {
        Ok(Some(event)) => {
            debug!(?event, "Realtime event");
            writer.apply(&event.into_observation());
        }
        Ok(None) => debug!("Ignoring unrecognised realtime event"),
        Err(e) => warn!("Ignoring realtime frame: {}", e),
    }
}
