use vigil_bridge::notification::Severity;

use crate::sound::{Sound, SoundMap};

/// Errors reported by a [`SoundPlayer`]. [`AudioCue`] logs and discards
/// them; they never reach the code that raised the notification.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The host has no usable output device.
    #[error("no audio output device available")]
    NoOutputDevice,
    /// The output backend refused to play.
    #[error("audio playback failed: {0}")]
    Backend(String),
}

/// Something that can make a sound audible.
pub trait SoundPlayer {
    fn play(&self, sound: &Sound, volume: f32) -> Result<(), PlaybackError>;
}

/// Player that only records cues in the log. Used when no output device
/// support is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPlayer;

impl SoundPlayer for LogPlayer {
    fn play(&self, sound: &Sound, volume: f32) -> Result<(), PlaybackError> {
        log::debug!(
            "Audio cue: {} Hz for {:?} at volume {volume:.2}",
            sound.frequency_hz,
            sound.duration
        );
        Ok(())
    }
}

/// Plays a sound keyed by notification severity, with volume and
/// enable/disable controls.
pub struct AudioCue<P> {
    player: P,
    sounds: SoundMap,
    enabled: bool,
    volume: f32,
}

impl<P: SoundPlayer> AudioCue<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            sounds: SoundMap::default(),
            enabled: true,
            volume: 0.3,
        }
    }

    /// Plays the sound mapped to `severity`. Does nothing while disabled;
    /// playback failures are logged and swallowed.
    pub fn play(&self, severity: Severity) {
        if !self.enabled {
            return;
        }

        let sound = self.sounds.resolve(severity);
        if let Err(error) = self.player.play(&sound, self.volume) {
            log::info!("Audio playback failed: {error}");
        }
    }

    /// Sets the volume, clamped to `[0, 1]`. Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Flips the enabled flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
