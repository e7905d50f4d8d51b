use serde_json::Value;
use vigil_bridge::MessageFromBackend;
use vigil_bridge::notification::NotificationMessage;

use crate::store;

/// Handles [`vigil_bridge::MessageToBackend::CameraCommand`].
pub async fn handle_camera_command(
    context: super::AppContextHandle,
    command: String,
    parameters: Value,
) {
    let state = context.state.read().await;
    log::info!("Sending camera command {command}");
    state.connection.camera_command(&command, parameters);
}

/// Handles [`vigil_bridge::MessageToBackend::AcknowledgeAlert`], reporting the
/// stored user id.
pub async fn handle_acknowledge_alert(context: super::AppContextHandle, alert_id: String) {
    let state = context.state.read().await;
    let user_id = store::user_id(state.store.as_ref());
    state.connection.acknowledge_alert(&alert_id, &user_id);
}

/// Handles [`vigil_bridge::MessageToBackend::Emit`].
pub async fn handle_emit(context: super::AppContextHandle, event: String, payload: Value) {
    context.state.read().await.connection.send(&event, payload);
}

/// Handles [`vigil_bridge::MessageToBackend::EmitBatched`].
pub async fn handle_emit_batched(context: super::AppContextHandle, event: String, payload: Value) {
    context.state.read().await.connection.batch(&event, payload);
}

/// Handles [`vigil_bridge::MessageToBackend::RequestFrame`].
pub async fn handle_request_frame(context: super::AppContextHandle) {
    context.state.read().await.connection.request_frame();
}

/// Handles [`vigil_bridge::MessageToBackend::RequestChannelStatus`].
pub async fn handle_request_channel_status(context: super::AppContextHandle) {
    context.state.read().await.connection.request_status();
}

/// Handles [`vigil_bridge::MessageToBackend::RequestData`]. The exchange runs
/// in its own task so the bridge keeps being served while it waits.
pub async fn handle_request_data(context: super::AppContextHandle, data_type: String) {
    let connection = context.state.read().await.connection.clone();
    tokio::spawn(async move {
        match connection.request(&data_type).await {
            Ok(payload) => {
                context
                    .send(MessageFromBackend::DataResponse { data_type, payload })
                    .await;
            }
            Err(error) => {
                log::warn!("Request for {data_type} failed: {error}");
                context
                    .send_notification(NotificationMessage::error(format!(
                        "Request for {data_type} failed: {error}"
                    )))
                    .await;
            }
        }
    });
}

/// Handles [`vigil_bridge::MessageToBackend::ForceReconnect`].
pub async fn handle_force_reconnect(context: super::AppContextHandle) {
    context.state.read().await.connection.force_reconnect();
}

/// Handles [`vigil_bridge::MessageToBackend::ConnectionStateRequest`].
pub async fn handle_connection_state_request(context: super::AppContextHandle) {
    let snapshot = context.state.read().await.connection.snapshot();
    context
        .send(MessageFromBackend::ConnectionStateResponse(snapshot))
        .await;
}

/// Handles [`vigil_bridge::MessageToBackend::TrafficLogRequest`].
pub async fn handle_traffic_log_request(context: super::AppContextHandle) {
    let records = context.state.read().await.debug.records();
    context
        .send(MessageFromBackend::TrafficLogResponse(records))
        .await;
}
