//! Presentation state of the dashboard.
//!
//! [`Dashboard::apply`] reduces backend messages into the state shown by the
//! terminal and into [`Reaction`]s that the event loop carries out:
//! notifications to show, delayed backend requests and settings to apply to
//! the audio cue.

use std::time::{Duration, Instant};

use vigil_bridge::events::{ServerEvent, VideoFrame, ViolationRecord};
use vigil_bridge::notification::NotificationMessage;
use vigil_bridge::settings::ClientSettings;
use vigil_bridge::{MessageFromBackend, MessageToBackend};

use crate::notifications::presets;

/// Latency above which the connection is reported as slow.
pub const HIGH_LATENCY_MS: u64 = 200;
/// Number of violations requested for the list.
pub const VIOLATION_LIST_LIMIT: u32 = 10;

const VIOLATION_REFRESH_DELAY: Duration = Duration::from_millis(1000);
const RECONNECT_REFRESH_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    Notify(NotificationMessage),
    /// Send `message` to the backend once `delay` has passed.
    Request {
        message: MessageToBackend,
        delay: Duration,
    },
    /// Settings to apply the same way a user change would.
    ApplySettings(ClientSettings),
}

#[derive(Debug, Default)]
pub struct Dashboard {
    pub online: bool,
    pub monitoring: bool,
    monitoring_since: Option<Instant>,
    pub system_status: Option<String>,
    pub access_status: Option<String>,
    pub recording: bool,
    pub people_count: u32,
    /// Approximate decoded size of the last video frame.
    pub frame_bytes: Option<u64>,
    pub latency: Option<u64>,
    pub settings: ClientSettings,
    pub violations: Vec<ViolationRecord>,
}

impl Dashboard {
    pub fn apply(&mut self, message: MessageFromBackend, now: Instant) -> Vec<Reaction> {
        match message {
            MessageFromBackend::NotificationMessage(notification) => {
                vec![Reaction::Notify(notification)]
            }
            MessageFromBackend::ServerEvent(event) => self.apply_server_event(event),
            MessageFromBackend::ConnectionStatus { connected, reason } => {
                self.apply_connection_status(connected, reason)
            }
            MessageFromBackend::ConnectionLatency(latency) => {
                self.latency = Some(latency);
                if latency > HIGH_LATENCY_MS {
                    log::warn!("High latency detected: {latency}ms");
                }
                Vec::new()
            }
            MessageFromBackend::MonitoringChanged(monitoring) => {
                self.set_monitoring(monitoring, now);
                Vec::new()
            }
            MessageFromBackend::SettingsRestored(settings) => {
                self.settings.merge(settings.clone());
                vec![Reaction::ApplySettings(settings)]
            }
            MessageFromBackend::ViolationsResponse(violations) => {
                self.violations = violations;
                Vec::new()
            }
            MessageFromBackend::ConfigurationResponse(_)
            | MessageFromBackend::ConnectionStateResponse(_)
            | MessageFromBackend::TrafficLogResponse(_)
            | MessageFromBackend::DataResponse { .. } => Vec::new(),
        }
    }

    fn apply_server_event(&mut self, event: ServerEvent) -> Vec<Reaction> {
        match event {
            ServerEvent::VideoFrame(frame) => {
                self.apply_frame(&frame);
                Vec::new()
            }
            ServerEvent::SystemStatus(status) => {
                self.system_status = Some(status.status);
                Vec::new()
            }
            ServerEvent::ViolationDetected(violation) => vec![
                Reaction::Notify(presets::violation_detected(&violation)),
                Reaction::Request {
                    message: MessageToBackend::ListViolations {
                        limit: VIOLATION_LIST_LIMIT,
                    },
                    delay: VIOLATION_REFRESH_DELAY,
                },
            ],
            ServerEvent::SystemError(error) => vec![Reaction::Notify(NotificationMessage::error(
                format!("System Error: {}", error.message),
            ))],
            ServerEvent::CameraConnected(camera) => {
                vec![Reaction::Notify(presets::camera_status(&camera, true))]
            }
            ServerEvent::CameraDisconnected(camera) => {
                self.system_status = Some("warning".to_string());
                vec![Reaction::Notify(presets::camera_status(&camera, false))]
            }
            ServerEvent::SystemAlert(alert) => {
                vec![Reaction::Notify(presets::security_alert(&alert))]
            }
            ServerEvent::RecordingStarted(_) => {
                self.recording = true;
                Vec::new()
            }
            ServerEvent::RecordingStopped(_) => {
                self.recording = false;
                Vec::new()
            }
            ServerEvent::Other { event, .. } => {
                log::debug!("Ignoring server event {event}");
                Vec::new()
            }
        }
    }

    fn apply_frame(&mut self, frame: &VideoFrame) {
        // Frames arrive base64 encoded.
        self.frame_bytes = Some(frame.frame.len() as u64 * 3 / 4);
        self.recording = frame.is_recording;
        self.people_count = frame.people_count;
        if !frame.status.is_empty() {
            self.access_status = Some(frame.status.clone());
        }
    }

    fn apply_connection_status(&mut self, connected: bool, reason: Option<String>) -> Vec<Reaction> {
        self.online = connected;
        if !connected {
            log::info!(
                "Connection lost: {}",
                reason.as_deref().unwrap_or("unknown reason")
            );
            self.frame_bytes = None;
            self.people_count = 0;
            self.access_status = None;
            return Vec::new();
        }

        [
            MessageToBackend::StatusRequest,
            MessageToBackend::ListViolations {
                limit: VIOLATION_LIST_LIMIT,
            },
        ]
        .into_iter()
        .map(|message| Reaction::Request {
            message,
            delay: RECONNECT_REFRESH_DELAY,
        })
        .collect()
    }

    fn set_monitoring(&mut self, monitoring: bool, now: Instant) {
        if monitoring && !self.monitoring {
            self.monitoring_since = Some(now);
        } else if !monitoring {
            self.monitoring_since = None;
        }
        self.monitoring = monitoring;
    }

    /// How long monitoring has been running, zero while stopped.
    pub fn uptime(&self, now: Instant) -> Duration {
        self.monitoring_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default()
    }
}
