use serde::{Deserialize, Serialize};

/// User-adjustable dashboard settings that are persisted and restored after
/// a reconnect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Recording quality preset, e.g. `1080p`.
    pub recording_quality: Option<String>,
    /// Alert volume in the `[0, 1]` range.
    pub alert_volume: Option<f32>,
}

impl ClientSettings {
    pub fn is_empty(&self) -> bool {
        self.recording_quality.is_none() && self.alert_volume.is_none()
    }

    /// Overwrites the fields that are set in `other`.
    pub fn merge(&mut self, other: ClientSettings) {
        if other.recording_quality.is_some() {
            self.recording_quality = other.recording_quality;
        }
        if other.alert_volume.is_some() {
            self.alert_volume = other.alert_volume;
        }
    }
}
