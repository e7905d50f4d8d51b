use vigil_bridge::MessageFromBackend;
use vigil_bridge::notification::NotificationMessage;

use crate::store::{self, keys};

/// Handles [`vigil_bridge::MessageToBackend::StartMonitoring`].
pub async fn handle_start_monitoring(context: super::AppContextHandle) {
    let api = context.state.read().await.api.clone();
    match api.start_monitoring().await {
        Ok(()) => {
            set_monitoring(&context, true).await;
            context
                .send_notification(NotificationMessage::success(
                    "Monitoring started successfully",
                ))
                .await;
        }
        Err(error) => {
            log::error!("Error starting monitoring: {error}");
            context
                .send_notification(NotificationMessage::error(format!(
                    "Failed to start monitoring: {error}"
                )))
                .await;
        }
    }
}

/// Handles [`vigil_bridge::MessageToBackend::StopMonitoring`].
pub async fn handle_stop_monitoring(context: super::AppContextHandle) {
    let api = context.state.read().await.api.clone();
    match api.stop_monitoring().await {
        Ok(()) => {
            set_monitoring(&context, false).await;
            context
                .send_notification(NotificationMessage::info("Monitoring stopped"))
                .await;
        }
        Err(error) => {
            log::error!("Error stopping monitoring: {error}");
            context
                .send_notification(NotificationMessage::error(format!(
                    "Failed to stop monitoring: {error}"
                )))
                .await;
        }
    }
}

/// Handles [`vigil_bridge::MessageToBackend::StatusRequest`]: adopts the
/// server's view of whether monitoring is running.
pub async fn handle_status_request(context: super::AppContextHandle) {
    let api = context.state.read().await.api.clone();
    match api.status().await {
        Ok(status) => set_monitoring(&context, status.monitoring).await,
        Err(error) => log::warn!("Error loading system status: {error}"),
    }
}

/// Records the monitoring flag in the session and the store, and tells the
/// frontend.
async fn set_monitoring(context: &super::AppContextHandle, monitoring: bool) {
    {
        let state = context.state.read().await;
        state.session.write().await.monitoring = monitoring;
        if let Err(error) = store::write(state.store.as_ref(), keys::MONITORING, &monitoring) {
            log::warn!("Failed to persist monitoring flag: {error}");
        }
    }
    context
        .send(MessageFromBackend::MonitoringChanged(monitoring))
        .await;
}

#[cfg(test)]
mod tests {
    use vigil_bridge::notification::Severity;
    use vigil_bridge::{MessageFromBackend, MessageToBackend};

    use crate::app::testing;

    #[tokio::test]
    async fn unreachable_server_yields_one_error_notification() {
        let dir = tempfile::tempdir().unwrap();
        let (context, _manager, mut rx) = testing::context(dir.path());

        context
            .dispatch_message(MessageToBackend::StartMonitoring)
            .await;

        match rx.try_recv() {
            Ok(MessageFromBackend::NotificationMessage(notification)) => {
                assert_eq!(notification.severity, Severity::Error);
                assert!(notification.message.starts_with("Failed to start monitoring"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        let state = context.state.read().await;
        assert!(!state.session.read().await.monitoring);
    }
}
