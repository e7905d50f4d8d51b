//! Communication bridge between the dashboard frontend and the backend.
//!
//! This crate defines the types and protocols used to connect the
//! presentation layer with an asynchronous backend responsible for the
//! real-time channel to the security server, the HTTP API, state recovery
//! and traffic inspection.
//!
//! The design is deliberately lightweight and unidirectional:
//! - The frontend sends commands (e.g., start monitoring, acknowledge an
//!   alert, update settings).
//! - The backend pushes events (e.g., server events, notifications,
//!   connection status changes).
//!
//! Communication happens over bounded [`tokio::sync::mpsc`] channels wrapped
//! in [`BridgeChannels`], providing back-pressure, async compatibility, and
//! clean separation of concerns.

pub mod config;
pub mod diagnostics;
pub mod events;
pub mod notification;
pub mod settings;

use serde_json::Value;
use tokio::sync::mpsc::{self, Receiver, Sender};

/// Messages emitted by the backend to inform the frontend of state updates.
#[derive(Debug, Clone)]
pub enum MessageFromBackend {
    /// Generic message for all notifications in the application.
    NotificationMessage(notification::NotificationMessage),
    /// Response to the configuration request from the frontend.
    ConfigurationResponse(config::Config),
    /// The real-time channel connected or dropped.
    ConnectionStatus {
        connected: bool,
        /// Why the channel dropped; `None` when connected.
        reason: Option<String>,
    },
    /// Round trip of the last heartbeat, in milliseconds.
    ConnectionLatency(u64),
    /// An event pushed by the security server.
    ServerEvent(events::ServerEvent),
    /// Monitoring was started or stopped.
    MonitoringChanged(bool),
    /// Persisted settings to apply as if the user had chosen them.
    SettingsRestored(settings::ClientSettings),
    /// Response to [`MessageToBackend::ListViolations`].
    ViolationsResponse(Vec<events::ViolationRecord>),
    /// Response to [`MessageToBackend::ConnectionStateRequest`].
    ConnectionStateResponse(diagnostics::ConnectionSnapshot),
    /// Response to [`MessageToBackend::TrafficLogRequest`], newest first.
    TrafficLogResponse(Vec<diagnostics::TrafficRecord>),
    /// Answer to [`MessageToBackend::RequestData`].
    DataResponse {
        data_type: String,
        payload: Value,
    },
}

/// Commands issued by the frontend to control or query the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageToBackend {
    /// Request for the application configuration.
    ConfigurationRequest,
    StartMonitoring,
    StopMonitoring,
    CameraCommand {
        command: String,
        parameters: Value,
    },
    AcknowledgeAlert(String),
    /// Generic event sent over the real-time channel.
    Emit {
        event: String,
        payload: Value,
    },
    /// Generic event sent as part of the next `batch_messages` frame.
    EmitBatched {
        event: String,
        payload: Value,
    },
    /// Asks the server to push a fresh video frame.
    RequestFrame,
    /// Asks the server over the channel to push its system status.
    RequestChannelStatus,
    /// Correlated `<type>_request` / `<type>_response` exchange.
    RequestData(String),
    /// The user changed one or more settings.
    UpdateSettings(settings::ClientSettings),
    ListViolations {
        limit: u32,
    },
    ClearViolations,
    ExportViolation(i64),
    ExportLogs,
    HealthCheck,
    TestAlarm,
    /// Request for a fresh server status (monitoring flag).
    StatusRequest,
    ForceReconnect,
    ConnectionStateRequest,
    TrafficLogRequest,
    /// Toggle the traffic log at runtime.
    SetTrafficLog(bool),
}

/// Paired `tokio::mpsc` channels for bidirectional communication between
/// frontend and backend.
pub struct BridgeChannels {
    /// Receiver used by the frontend to get messages from the backend.
    pub frontend_rx: Receiver<MessageFromBackend>,
    /// Sender used by the frontend to send commands to the backend.
    pub frontend_tx: Sender<MessageToBackend>,

    /// Receiver used by the backend to get commands from the frontend.
    pub backend_rx: Receiver<MessageToBackend>,
    /// Sender used by the backend to send events/responses to the frontend.
    pub backend_tx: Sender<MessageFromBackend>,
}

impl BridgeChannels {
    /// Creates a new pair of bridged channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (to_backend_tx, to_backend_rx) = mpsc::channel(buffer);
        let (to_frontend_tx, to_frontend_rx) = mpsc::channel(buffer);
        Self {
            frontend_tx: to_backend_tx,
            frontend_rx: to_frontend_rx,
            backend_rx: to_backend_rx,
            backend_tx: to_frontend_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(256)
    }
}
