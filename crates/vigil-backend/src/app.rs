//! Application context and message dispatching utilities.
//!
//! The context contains the shared state and provides helpers for sending
//! responses and notifications back to the frontend bridge.

use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};
use vigil_bridge::notification::NotificationMessage;
use vigil_bridge::{MessageFromBackend, MessageToBackend};

use crate::services;
use crate::state::SharedState;

/// Shared application context passed to services and message handlers.
pub(crate) struct AppContext {
    /// Mutable runtime application state shared across services.
    pub state: SharedState,
    /// Outbound channel to the frontend bridge.
    pub tx: Sender<MessageFromBackend>,
}

impl AppContext {
    /// Read and dispatch messages from the frontend bridge until it closes.
    pub async fn consume_bridge_messages(self: &Arc<Self>, mut rx: Receiver<MessageToBackend>) {
        while let Some(message) = rx.recv().await {
            log::debug!("Got a frontend message: {message:?}");
            self.dispatch_message(message).await;
        }
        log::info!("Frontend bridge closed");
    }

    /// Dispatches the received message from frontend down to individual
    /// service handlers.
    pub async fn dispatch_message(self: &Arc<Self>, message: MessageToBackend) {
        match message {
            MessageToBackend::ConfigurationRequest => {
                services::config_service::handle_config_request(self.clone()).await;
            }
            MessageToBackend::SetTrafficLog(enabled) => {
                services::config_service::handle_set_traffic_log(self.clone(), enabled).await;
            }
            MessageToBackend::StartMonitoring => {
                services::monitoring_service::handle_start_monitoring(self.clone()).await;
            }
            MessageToBackend::StopMonitoring => {
                services::monitoring_service::handle_stop_monitoring(self.clone()).await;
            }
            MessageToBackend::StatusRequest => {
                services::monitoring_service::handle_status_request(self.clone()).await;
            }
            MessageToBackend::CameraCommand {
                command,
                parameters,
            } => {
                services::command_service::handle_camera_command(self.clone(), command, parameters)
                    .await;
            }
            MessageToBackend::AcknowledgeAlert(alert_id) => {
                services::command_service::handle_acknowledge_alert(self.clone(), alert_id).await;
            }
            MessageToBackend::Emit { event, payload } => {
                services::command_service::handle_emit(self.clone(), event, payload).await;
            }
            MessageToBackend::EmitBatched { event, payload } => {
                services::command_service::handle_emit_batched(self.clone(), event, payload)
                    .await;
            }
            MessageToBackend::RequestFrame => {
                services::command_service::handle_request_frame(self.clone()).await;
            }
            MessageToBackend::RequestChannelStatus => {
                services::command_service::handle_request_channel_status(self.clone()).await;
            }
            MessageToBackend::RequestData(data_type) => {
                services::command_service::handle_request_data(self.clone(), data_type).await;
            }
            MessageToBackend::ForceReconnect => {
                services::command_service::handle_force_reconnect(self.clone()).await;
            }
            MessageToBackend::ConnectionStateRequest => {
                services::command_service::handle_connection_state_request(self.clone()).await;
            }
            MessageToBackend::TrafficLogRequest => {
                services::command_service::handle_traffic_log_request(self.clone()).await;
            }
            MessageToBackend::UpdateSettings(settings) => {
                services::settings_service::handle_update_settings(self.clone(), settings).await;
            }
            MessageToBackend::ListViolations { limit } => {
                services::violation_service::handle_list_violations(self.clone(), limit).await;
            }
            MessageToBackend::ClearViolations => {
                services::violation_service::handle_clear_violations(self.clone()).await;
            }
            MessageToBackend::ExportViolation(id) => {
                services::violation_service::handle_export_violation(self.clone(), id).await;
            }
            MessageToBackend::ExportLogs => {
                services::violation_service::handle_export_logs(self.clone()).await;
            }
            MessageToBackend::HealthCheck => {
                services::system_service::handle_health_check(self.clone()).await;
            }
            MessageToBackend::TestAlarm => {
                services::system_service::handle_test_alarm(self.clone()).await;
            }
        }
    }

    /// Send a message to the frontend bridge.
    pub async fn send(&self, message: MessageFromBackend) {
        if self.tx.send(message).await.is_err() {
            log::warn!("Frontend bridge is closed, dropping message");
        }
    }

    /// Send a notification message to the frontend bridge.
    pub async fn send_notification(&self, notification: NotificationMessage) {
        self.send(MessageFromBackend::NotificationMessage(notification))
            .await;
    }
}
