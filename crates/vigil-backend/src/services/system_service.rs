use vigil_bridge::notification::NotificationMessage;

/// Handles [`vigil_bridge::MessageToBackend::HealthCheck`].
pub async fn handle_health_check(context: super::AppContextHandle) {
    let api = context.state.read().await.api.clone();
    let notification = match api.health().await {
        Ok(report) if report.is_healthy() => NotificationMessage::success("System is healthy"),
        Ok(report) => NotificationMessage::warning(format!(
            "System issues detected: {}",
            report.issues.join(", ")
        )),
        Err(error) => {
            log::error!("Error checking system health: {error}");
            NotificationMessage::error("Error checking system health")
        }
    };
    context.send_notification(notification).await;
}

/// Handles [`vigil_bridge::MessageToBackend::TestAlarm`].
pub async fn handle_test_alarm(context: super::AppContextHandle) {
    let api = context.state.read().await.api.clone();
    let notification = match api.test_alarm().await {
        Ok(()) => NotificationMessage::success("Alarm test completed"),
        Err(error) => {
            log::error!("Error testing alarm: {error}");
            NotificationMessage::error(format!("Alarm test failed: {error}"))
        }
    };
    context.send_notification(notification).await;
}
