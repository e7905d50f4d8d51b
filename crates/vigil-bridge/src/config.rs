use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Addresses of the security server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket endpoint of the real-time channel.
    pub socket_url: String,
    /// Base URL of the HTTP API (start/stop monitoring, violations, etc.).
    pub http_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_url: "ws://127.0.0.1:5000/ws".to_string(),
            http_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

/// Reconnection, heartbeat and queueing parameters of the real-time channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// How many reconnection attempts are made before giving up.
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnection attempts, in milliseconds.
    pub reconnect_interval_ms: u64,
    /// Interval between heartbeat pings while connected, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// How long to wait for a pong before the connection is considered
    /// unhealthy, in milliseconds.
    pub ping_timeout_ms: u64,
    /// Upper bound for a single connection attempt, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Maximum number of outbound messages kept while disconnected. The
    /// oldest message is dropped when the queue is full.
    pub queue_capacity: usize,
    /// Delay between dropping the channel and connecting again on a forced
    /// reconnect, in milliseconds.
    pub force_reconnect_delay_ms: u64,
    /// Interval of the periodic connection health log line, in milliseconds.
    pub health_log_interval_ms: u64,
    /// Number of batched messages that triggers an immediate flush.
    pub batch_size: usize,
    /// Delay before a partial batch is flushed, in milliseconds.
    pub batch_flush_interval_ms: u64,
    /// How long a correlated request waits for its response, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_interval_ms: 5000,
            heartbeat_interval_ms: 30_000,
            ping_timeout_ms: 5000,
            connect_timeout_ms: 5000,
            queue_capacity: 1000,
            force_reconnect_delay_ms: 1000,
            health_log_interval_ms: 60_000,
            batch_size: 10,
            batch_flush_interval_ms: 100,
            request_timeout_ms: 10_000,
        }
    }
}

impl ConnectionConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn force_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.force_reconnect_delay_ms)
    }

    pub fn health_log_interval(&self) -> Duration {
        Duration::from_millis(self.health_log_interval_ms)
    }

    pub fn batch_flush_interval(&self) -> Duration {
        Duration::from_millis(self.batch_flush_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Display limits of the notification area.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Maximum number of notifications shown at the same time.
    pub max_active: usize,
    /// Time a closed notification stays around for its exit animation, in
    /// milliseconds. Zero removes it immediately.
    pub removal_grace_ms: u64,
    /// Number of entries kept in the notification history.
    pub history_capacity: usize,
    /// Whether notifications are accompanied by audio cues.
    pub sound_enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_active: 5,
            removal_grace_ms: 300,
            history_capacity: 100,
            sound_enabled: true,
        }
    }
}

impl NotificationConfig {
    pub fn removal_grace(&self) -> Duration {
        Duration::from_millis(self.removal_grace_ms)
    }
}

/// Audio cue settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    /// Playback volume in the `[0, 1]` range.
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.3,
        }
    }
}

/// Restoration of client state after a reconnect.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub enabled: bool,
    /// Pause after a successful connect before state is restored, in
    /// milliseconds.
    pub settle_delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_delay_ms: 1000,
        }
    }
}

impl RecoveryConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Development-only traffic log of the real-time channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Record inbound and outbound channel traffic.
    pub traffic_log: bool,
    /// Number of traffic records kept.
    pub max_entries: usize,
    /// Maximum length of the payload preview stored with each record.
    pub preview_length: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            traffic_log: false,
            max_entries: 100,
            preview_length: 100,
        }
    }
}

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    pub notifications: NotificationConfig,
    pub audio: AudioConfig,
    pub recovery: RecoveryConfig,
    pub debug: DebugConfig,
}
