use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Severity or category for user-visible notifications.
///
/// This enum classifies notifications by their intent and visual styling,
/// allowing the UI to display them appropriately and the audio cue to pick a
/// matching sound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Neutral informational message that does not indicate success or failure.
    #[default]
    Info,
    /// Indicates a successful operation or positive outcome.
    Success,
    /// Indicates a non-critical issue that the user should be aware of, but
    /// does not prevent normal operation.
    Warning,
    /// Indicates an error or failure that may affect functionality.
    Error,
}

impl Severity {
    /// Parses a severity name coming from the server or the user. Names that
    /// do not match any variant fall back to [`Severity::Info`].
    pub fn parse_lossy(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "success" => Severity::Success,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// How long a notification of this severity stays on screen when the
    /// caller does not ask for a specific duration.
    pub fn default_duration(self) -> Duration {
        match self {
            Severity::Success | Severity::Info => Duration::from_millis(5000),
            Severity::Warning => Duration::from_millis(6000),
            Severity::Error => Duration::from_millis(8000),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Controls when a notification is dismissed automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DismissAfter {
    /// Use the duration associated with the notification severity (see
    /// [`Severity::default_duration`]).
    #[default]
    SeverityDefault,
    /// Keep the notification until it is closed or evicted.
    Never,
    /// Dismiss after the given duration. A zero duration is treated as
    /// [`DismissAfter::Never`].
    After(Duration),
}

impl DismissAfter {
    /// Shorthand for [`DismissAfter::After`] in milliseconds.
    pub fn millis(milliseconds: u64) -> Self {
        DismissAfter::After(Duration::from_millis(milliseconds))
    }

    /// Resolves the effective auto-dismiss delay, `None` meaning persistent.
    pub fn resolve(self, severity: Severity) -> Option<Duration> {
        match self {
            DismissAfter::SeverityDefault => Some(severity.default_duration()),
            DismissAfter::Never => None,
            DismissAfter::After(duration) if duration.is_zero() => None,
            DismissAfter::After(duration) => Some(duration),
        }
    }
}

/// What happens when the user activates the action attached to a
/// notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Play the recorded clip of a violation, if the server provided one.
    PlayClip(Option<String>),
    /// Show the details of a security alert.
    ShowAlertDetails,
}

/// A user-activatable action attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    /// Button label shown next to the message.
    pub label: String,
    pub kind: ActionKind,
}

/// A notification payload intended for the user interface.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    /// The severity of the notification, determining its visual style.
    pub severity: Severity,
    /// The text content to display to the user.
    pub message: String,
    /// When the notification should be dismissed automatically.
    pub dismiss_after: DismissAfter,
    /// Whether an audio cue may accompany this notification.
    pub sound: bool,
    /// Optional action button.
    pub action: Option<NotificationAction>,
}

impl NotificationMessage {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            dismiss_after: DismissAfter::SeverityDefault,
            sound: true,
            action: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn dismiss_after(mut self, dismiss_after: DismissAfter) -> Self {
        self.dismiss_after = dismiss_after;
        self
    }

    pub fn persistent(self) -> Self {
        self.dismiss_after(DismissAfter::Never)
    }

    pub fn silent(mut self) -> Self {
        self.sound = false;
        self
    }

    pub fn with_action(mut self, label: impl Into<String>, kind: ActionKind) -> Self {
        self.action = Some(NotificationAction {
            label: label.into(),
            kind,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_severity_falls_back_to_info() {
        assert_eq!(Severity::parse_lossy("critical"), Severity::Info);
        assert_eq!(Severity::parse_lossy(" Warning "), Severity::Warning);
        assert_eq!(Severity::parse_lossy("error"), Severity::Error);
    }

    #[test]
    fn default_durations_follow_severity() {
        assert_eq!(
            DismissAfter::SeverityDefault.resolve(Severity::Info),
            Some(Duration::from_millis(5000))
        );
        assert_eq!(
            DismissAfter::SeverityDefault.resolve(Severity::Warning),
            Some(Duration::from_millis(6000))
        );
        assert_eq!(
            DismissAfter::SeverityDefault.resolve(Severity::Error),
            Some(Duration::from_millis(8000))
        );
    }

    #[test]
    fn zero_duration_means_persistent() {
        assert_eq!(DismissAfter::millis(0).resolve(Severity::Error), None);
        assert_eq!(DismissAfter::Never.resolve(Severity::Info), None);
        assert_eq!(
            DismissAfter::millis(2000).resolve(Severity::Info),
            Some(Duration::from_millis(2000))
        );
    }
}
