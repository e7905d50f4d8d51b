//! Ready-made notifications for server events.

use vigil_bridge::events::{CameraStatus, SystemAlert, ViolationDetected};
use vigil_bridge::notification::{ActionKind, DismissAfter, NotificationMessage, Severity};

/// Alert raised by the server. `high` alerts are errors, everything else a
/// warning.
pub fn security_alert(alert: &SystemAlert) -> NotificationMessage {
    let severity = if alert.severity == "high" {
        Severity::Error
    } else {
        Severity::Warning
    };
    NotificationMessage::new(severity, format!("🔒 {}", alert.message))
        .dismiss_after(DismissAfter::millis(10_000))
        .with_action("View Details", ActionKind::ShowAlertDetails)
}

pub fn camera_status(camera: &CameraStatus, online: bool) -> NotificationMessage {
    let label = camera.label();
    let message = if online {
        NotificationMessage::success(format!("📹 Camera {label} connected"))
    } else {
        NotificationMessage::error(format!("📵 Camera {label} disconnected"))
    };
    message.dismiss_after(DismissAfter::millis(5000))
}

pub fn violation_detected(violation: &ViolationDetected) -> NotificationMessage {
    NotificationMessage::warning(format!(
        "⚠️ Violation: {} people detected",
        violation.count
    ))
    .dismiss_after(DismissAfter::millis(8000))
    .with_action(
        "View Footage",
        ActionKind::PlayClip(violation.clip_path.clone()),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn high_alerts_are_errors() {
        let alert = SystemAlert {
            message: "Door forced".to_string(),
            severity: "high".to_string(),
        };
        let message = security_alert(&alert);
        assert_eq!(message.severity, Severity::Error);
        assert_eq!(message.message, "🔒 Door forced");
        assert_eq!(message.dismiss_after, DismissAfter::millis(10_000));
        assert_eq!(
            message.action.map(|action| action.kind),
            Some(ActionKind::ShowAlertDetails)
        );

        let alert = SystemAlert {
            severity: "medium".to_string(),
            ..alert
        };
        assert_eq!(security_alert(&alert).severity, Severity::Warning);
    }

    #[test]
    fn violation_carries_the_clip() {
        let violation = ViolationDetected {
            status: "violation".to_string(),
            count: 3,
            clip_path: Some("clips/v1.mp4".to_string()),
        };
        let message = violation_detected(&violation);
        assert_eq!(message.message, "⚠️ Violation: 3 people detected");
        assert_eq!(message.severity, Severity::Warning);
        let action = message.action.unwrap();
        assert_eq!(action.label, "View Footage");
        assert_eq!(
            action.kind,
            ActionKind::PlayClip(Some("clips/v1.mp4".to_string()))
        );
    }

    #[test]
    fn camera_status_uses_the_camera_label() {
        let camera = CameraStatus { id: json!(2) };
        let online = camera_status(&camera, true);
        assert_eq!(online.message, "📹 Camera 2 connected");
        assert_eq!(online.severity, Severity::Success);

        let offline = camera_status(&camera, false);
        assert_eq!(offline.message, "📵 Camera 2 disconnected");
        assert_eq!(offline.severity, Severity::Error);
    }
}
