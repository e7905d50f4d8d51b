//! Payloads exchanged with the security server over the real-time channel.
//!
//! Inbound events are decoded into [`ServerEvent`]; outbound commands are
//! plain serializable structs so they can travel through the generic
//! `send(event, payload)` path of the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names used on the real-time channel.
pub mod names {
    pub const VIDEO_FRAME: &str = "video_frame";
    pub const SYSTEM_STATUS: &str = "system_status";
    pub const VIOLATION_DETECTED: &str = "violation_detected";
    pub const SYSTEM_ERROR: &str = "system_error";
    pub const CAMERA_CONNECTED: &str = "camera_connected";
    pub const CAMERA_DISCONNECTED: &str = "camera_disconnected";
    pub const SYSTEM_ALERT: &str = "system_alert";
    pub const RECORDING_STARTED: &str = "recording_started";
    pub const RECORDING_STOPPED: &str = "recording_stopped";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const START_MONITORING: &str = "start_monitoring";
    pub const STOP_MONITORING: &str = "stop_monitoring";
    pub const CAMERA_COMMAND: &str = "camera_command";
    pub const ACKNOWLEDGE_ALERT: &str = "acknowledge_alert";
    pub const REQUEST_FRAME: &str = "request_frame";
    pub const REQUEST_STATUS: &str = "request_status";
    pub const BATCH_MESSAGES: &str = "batch_messages";

    /// Published locally by the connection on every connect and disconnect.
    pub const CONNECTION_STATUS: &str = "connection_status";
    /// Published locally after each heartbeat round trip.
    pub const CONNECTION_LATENCY: &str = "connection_latency";

    /// Server events forwarded to the dashboard.
    pub const SERVER_EVENTS: [&str; 9] = [
        VIDEO_FRAME,
        SYSTEM_STATUS,
        VIOLATION_DETECTED,
        SYSTEM_ERROR,
        CAMERA_CONNECTED,
        CAMERA_DISCONNECTED,
        SYSTEM_ALERT,
        RECORDING_STARTED,
        RECORDING_STOPPED,
    ];
}

/// A processed camera frame pushed by the server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VideoFrame {
    /// Encoded frame data (base64 JPEG on the reference server).
    pub frame: String,
    pub is_recording: bool,
    /// Access status line computed by the server, e.g. `Access Granted`.
    pub status: String,
    pub people_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemStatus {
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViolationDetected {
    pub status: String,
    /// Number of people that triggered the violation.
    pub count: u32,
    #[serde(rename = "clipPath", skip_serializing_if = "Option::is_none")]
    pub clip_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemError {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CameraStatus {
    /// Camera identifier; the server sends either a number or a string.
    pub id: Value,
}

impl CameraStatus {
    /// The camera identifier rendered for display.
    pub fn label(&self) -> String {
        match &self.id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SystemAlert {
    pub message: String,
    #[serde(default = "default_alert_severity")]
    pub severity: String,
}

fn default_alert_severity() -> String {
    "warning".to_string()
}

/// Heartbeat request; the server echoes the same payload back as a pong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Ping {
    /// Milliseconds since the Unix epoch at the time the ping was sent.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pong {
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonitoringCommand {
    pub timestamp: u64,
    /// Who issued the command, e.g. `dashboard` or `recovery`.
    pub source: String,
}

/// Payload of requests that carry nothing but their send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Timestamped {
    pub timestamp: u64,
}

/// Body of a `<type>_request`; the server echoes `requestId` in the
/// matching `<type>_response`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequest {
    pub request_id: String,
    pub timestamp: u64,
}

/// One entry of a `batch_messages` frame.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BatchedMessage {
    pub event: String,
    pub data: Value,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CameraCommand {
    pub command: String,
    pub parameters: Value,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeAlert {
    pub alert_id: String,
    pub timestamp: u64,
    pub user_id: String,
}

/// Inbound events the dashboard knows how to present.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    VideoFrame(VideoFrame),
    SystemStatus(SystemStatus),
    ViolationDetected(ViolationDetected),
    SystemError(SystemError),
    CameraConnected(CameraStatus),
    CameraDisconnected(CameraStatus),
    SystemAlert(SystemAlert),
    RecordingStarted(Value),
    RecordingStopped(Value),
    /// Any event without a dedicated representation.
    Other { event: String, payload: Value },
}

impl ServerEvent {
    /// Decodes an inbound channel event by name.
    pub fn decode(event: &str, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match event {
            names::VIDEO_FRAME => ServerEvent::VideoFrame(serde_json::from_value(payload)?),
            names::SYSTEM_STATUS => ServerEvent::SystemStatus(serde_json::from_value(payload)?),
            names::VIOLATION_DETECTED => {
                ServerEvent::ViolationDetected(serde_json::from_value(payload)?)
            }
            names::SYSTEM_ERROR => ServerEvent::SystemError(serde_json::from_value(payload)?),
            names::CAMERA_CONNECTED => {
                ServerEvent::CameraConnected(serde_json::from_value(payload)?)
            }
            names::CAMERA_DISCONNECTED => {
                ServerEvent::CameraDisconnected(serde_json::from_value(payload)?)
            }
            names::SYSTEM_ALERT => ServerEvent::SystemAlert(serde_json::from_value(payload)?),
            names::RECORDING_STARTED => ServerEvent::RecordingStarted(payload),
            names::RECORDING_STOPPED => ServerEvent::RecordingStopped(payload),
            other => ServerEvent::Other {
                event: other.to_string(),
                payload,
            },
        })
    }
}

/// A row of the violation list returned by the HTTP API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViolationRecord {
    pub id: i64,
    pub timestamp: String,
    pub person_count: u32,
    pub clip_path: Option<String>,
    /// Clip duration in seconds.
    pub duration: Option<f64>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_violation_with_clip_path() {
        let event = ServerEvent::decode(
            names::VIOLATION_DETECTED,
            json!({"status": "violation", "count": 3, "clipPath": "clip_01.mp4"}),
        )
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::ViolationDetected(ViolationDetected {
                status: "violation".to_string(),
                count: 3,
                clip_path: Some("clip_01.mp4".to_string()),
            })
        );
    }

    #[test]
    fn unknown_events_are_kept_verbatim() {
        let event = ServerEvent::decode("connected", json!({"data": "hello"})).unwrap();
        assert_eq!(
            event,
            ServerEvent::Other {
                event: "connected".to_string(),
                payload: json!({"data": "hello"}),
            }
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(ServerEvent::decode(names::SYSTEM_ALERT, json!({"severity": "high"})).is_err());
    }

    #[test]
    fn acknowledgement_uses_camel_case_keys() {
        let payload = serde_json::to_value(AcknowledgeAlert {
            alert_id: "a-1".to_string(),
            timestamp: 10,
            user_id: "anonymous".to_string(),
        })
        .unwrap();
        assert_eq!(
            payload,
            json!({"alertId": "a-1", "timestamp": 10, "userId": "anonymous"})
        );
    }

    #[test]
    fn numeric_camera_ids_render_without_quotes() {
        let status: CameraStatus = serde_json::from_value(json!({"id": 2})).unwrap();
        assert_eq!(status.label(), "2");
        let status: CameraStatus = serde_json::from_value(json!({"id": "front"})).unwrap();
        assert_eq!(status.label(), "front");
    }
}
