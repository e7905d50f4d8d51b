use serde::{Deserialize, Serialize};

/// Lifecycle of the real-time channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for the next scheduled reconnection attempt.
    Reconnecting,
    /// Reconnection attempts are exhausted; nothing happens automatically
    /// until a forced reconnect.
    Failed,
}

/// Point-in-time view of the connection bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    /// Number of outbound messages waiting for a connection.
    pub queued_messages: usize,
    /// Unix milliseconds of the last heartbeat ping.
    pub last_ping: Option<u64>,
    /// Unix milliseconds of the last inbound frame.
    pub last_activity: Option<u64>,
    /// Round trip of the last answered ping, in milliseconds.
    pub latency: Option<u64>,
}

impl ConnectionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Direction of a recorded channel frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::In => formatter.write_str("IN"),
            Direction::Out => formatter.write_str("OUT"),
        }
    }
}

/// One entry of the channel traffic log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrafficRecord {
    /// Unix milliseconds at which the frame was observed.
    pub timestamp: u64,
    pub direction: Direction,
    pub event: String,
    /// Serialized payload, truncated; `None` for empty payloads.
    pub preview: Option<String>,
}
