//! Transport seam of the real-time channel.
//!
//! A [`Connector`] opens a [`ChannelLink`]: a pair of unbounded channels
//! carrying outbound [`Frame`]s and inbound [`ChannelEvent`]s. The
//! connection manager never sees the underlying socket, which keeps the
//! reconnection logic independent of the wire protocol.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// A named event with a JSON payload, as carried on the channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Why a channel stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The underlying connection closed or failed unexpectedly.
    TransportClose,
    /// No pong arrived within the heartbeat timeout.
    PingTimeout,
    /// The server closed the channel on purpose.
    ServerDisconnect,
    /// This client closed the channel on purpose.
    ClientDisconnect,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::TransportClose => "transport close",
            DisconnectReason::PingTimeout => "ping timeout",
            DisconnectReason::ServerDisconnect => "io server disconnect",
            DisconnectReason::ClientDisconnect => "io client disconnect",
        }
    }

    /// Transient drops are retried automatically; deliberate closes are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DisconnectReason::TransportClose | DisconnectReason::PingTimeout
        )
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Something that happened on an open channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Frame(Frame),
    Closed(DisconnectReason),
}

/// The client side of an open channel.
#[derive(Debug)]
pub struct ChannelLink {
    pub outbound: UnboundedSender<Frame>,
    pub inbound: UnboundedReceiver<ChannelEvent>,
}

/// Errors that can occur while opening a channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The WebSocket handshake or the underlying TCP connection failed.
    #[error("websocket connection failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// The peer refused the connection.
    #[error("connection refused: {0}")]
    Refused(String),
}

/// Opens channels to the server. Called once per connection attempt.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self) -> BoxFuture<'static, Result<ChannelLink, TransportError>>;

    /// Human-readable description of the endpoint, used in log lines.
    fn describe(&self) -> String;
}
