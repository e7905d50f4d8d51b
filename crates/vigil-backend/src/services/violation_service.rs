use vigil_bridge::MessageFromBackend;
use vigil_bridge::notification::NotificationMessage;

/// Handles [`vigil_bridge::MessageToBackend::ListViolations`].
pub async fn handle_list_violations(context: super::AppContextHandle, limit: u32) {
    let api = context.state.read().await.api.clone();
    match api.violations(limit).await {
        Ok(violations) => {
            log::debug!("Loaded {} violations", violations.len());
            context
                .send(MessageFromBackend::ViolationsResponse(violations))
                .await;
        }
        Err(error) => {
            log::error!("Error loading violations: {error}");
            context
                .send_notification(NotificationMessage::error("Error loading violations"))
                .await;
        }
    }
}

/// Handles [`vigil_bridge::MessageToBackend::ClearViolations`], reloading the
/// list afterwards.
pub async fn handle_clear_violations(context: super::AppContextHandle) {
    let api = context.state.read().await.api.clone();
    match api.clear_violations().await {
        Ok(()) => {
            context
                .send_notification(NotificationMessage::success("Violation history cleared"))
                .await;
            handle_list_violations(context, DEFAULT_LIST_LIMIT).await;
        }
        Err(error) => {
            log::error!("Error clearing violations: {error}");
            context
                .send_notification(NotificationMessage::error(format!("Error: {error}")))
                .await;
        }
    }
}

/// Number of violations shown in the dashboard list.
pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Handles [`vigil_bridge::MessageToBackend::ExportViolation`].
pub async fn handle_export_violation(context: super::AppContextHandle, id: i64) {
    let (api, dir) = {
        let state = context.state.read().await;
        (state.api.clone(), state.paths.exports_dir())
    };
    match api.export_violation(id, &dir).await {
        Ok(path) => {
            context
                .send_notification(NotificationMessage::success(format!(
                    "Violation exported to {}",
                    path.display()
                )))
                .await;
        }
        Err(error) => {
            log::error!("Error exporting violation {id}: {error}");
            context
                .send_notification(NotificationMessage::error("Failed to export violation"))
                .await;
        }
    }
}

/// Handles [`vigil_bridge::MessageToBackend::ExportLogs`].
pub async fn handle_export_logs(context: super::AppContextHandle) {
    let (api, dir) = {
        let state = context.state.read().await;
        (state.api.clone(), state.paths.exports_dir())
    };
    match api.export_logs(&dir).await {
        Ok(path) => {
            context
                .send_notification(NotificationMessage::success(format!(
                    "Logs exported to {}",
                    path.display()
                )))
                .await;
        }
        Err(error) => {
            log::error!("Error exporting logs: {error}");
            context
                .send_notification(NotificationMessage::error("Failed to export logs"))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use vigil_bridge::notification::Severity;
    use vigil_bridge::{MessageFromBackend, MessageToBackend};

    use crate::app::testing;

    #[tokio::test]
    async fn failed_export_reports_an_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (context, _manager, mut rx) = testing::context(dir.path());

        context
            .dispatch_message(MessageToBackend::ExportViolation(4))
            .await;

        match rx.try_recv() {
            Ok(MessageFromBackend::NotificationMessage(notification)) => {
                assert_eq!(notification.severity, Severity::Error);
                assert_eq!(notification.message, "Failed to export violation");
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(!dir.path().join("data").join("exports").exists());
    }
}
