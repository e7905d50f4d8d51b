use std::collections::HashMap;
use std::f32::consts::TAU;
use std::time::Duration;

use vigil_bridge::notification::Severity;

/// Length of the linear fade applied to both ends of a tone, which avoids
/// audible clicks.
const FADE: Duration = Duration::from_millis(10);

/// A short sine tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sound {
    pub frequency_hz: f32,
    pub duration: Duration,
}

impl Sound {
    pub const fn new(frequency_hz: f32, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration: Duration::from_millis(duration_ms),
        }
    }

    /// Renders the tone as mono samples at `sample_rate`, scaled by `volume`.
    pub fn render(&self, sample_rate: u32, volume: f32) -> Vec<f32> {
        let total = (self.duration.as_secs_f64() * sample_rate as f64).round() as usize;
        let fade = ((FADE.as_secs_f64() * sample_rate as f64) as usize).min(total / 2);
        let step = TAU * self.frequency_hz / sample_rate as f32;

        (0..total)
            .map(|index| {
                let envelope = if fade == 0 {
                    1.0
                } else if index < fade {
                    index as f32 / fade as f32
                } else if index >= total - fade {
                    (total - index - 1) as f32 / fade as f32
                } else {
                    1.0
                };
                (step * index as f32).sin() * volume * envelope
            })
            .collect()
    }
}

/// Severity to sound mapping. Severities without an entry use the `info`
/// sound.
#[derive(Debug, Clone)]
pub struct SoundMap {
    sounds: HashMap<Severity, Sound>,
    fallback: Sound,
}

impl Default for SoundMap {
    fn default() -> Self {
        let info = Sound::new(660.0, 120);
        let sounds = HashMap::from([
            (Severity::Success, Sound::new(880.0, 150)),
            (Severity::Error, Sound::new(220.0, 400)),
            (Severity::Warning, Sound::new(440.0, 250)),
            (Severity::Info, info),
        ]);
        Self {
            sounds,
            fallback: info,
        }
    }
}

impl SoundMap {
    pub fn resolve(&self, severity: Severity) -> Sound {
        self.sounds.get(&severity).copied().unwrap_or(self.fallback)
    }
}
