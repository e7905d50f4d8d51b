//! Real-time channel to the security server.
//!
//! [`ConnectionManager`] owns the channel and runs as a single task. It
//! reconnects on transient drops, queues outbound frames while offline and
//! keeps the link alive with a ping/pong heartbeat. Everything else talks to
//! it through a cloneable [`ConnectionHandle`].

mod listeners;
mod manager;
mod queue;
#[cfg(test)]
pub(crate) mod testing;
mod timer;
pub mod transport;
pub mod websocket;

use std::time::{SystemTime, UNIX_EPOCH};

pub use listeners::{Listener, ListenerId};
pub(crate) use timer::Timer;
pub use manager::{Collaborators, ConnectionHandle, ConnectionManager, RequestError};
pub use transport::{
    ChannelEvent, ChannelLink, Connector, DisconnectReason, Frame, TransportError,
};
pub use websocket::WebSocketConnector;

/// Observes every frame that crosses the channel.
pub trait TrafficTap: Send + Sync {
    fn outbound(&self, frame: &Frame);
    fn inbound(&self, frame: &Frame);
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
