use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::cue::{PlaybackError, SoundPlayer};
use crate::sound::Sound;

/// Extra time the stream is kept alive after the tone ends, so the device
/// buffer drains before the stream is dropped.
const DRAIN_TAIL: Duration = Duration::from_millis(50);

/// Errors that can occur while opening the output device or its stream.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The default host reports no output device.
    #[error("no default output device")]
    NoOutputDevice,
    /// Failed to obtain the device's default output stream configuration.
    #[error("failed to build device config: {0}")]
    BuildStreamConfig(#[from] cpal::DefaultStreamConfigError),
    /// The audio backend rejected the output stream configuration.
    #[error("failed to build device output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    /// The stream was built but could not be started.
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Plays cues on the default output device of the default host.
///
/// Each cue runs on its own short-lived thread because `cpal` streams are
/// not `Send` on every platform; the thread owns the stream until the tone
/// has finished.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalPlayer;

impl SoundPlayer for CpalPlayer {
    fn play(&self, sound: &Sound, volume: f32) -> Result<(), PlaybackError> {
        let sound = *sound;
        std::thread::Builder::new()
            .name("audio-cue".to_string())
            .spawn(move || {
                if let Err(error) = play_on_default_device(&sound, volume) {
                    log::info!("Audio playback failed: {error}");
                }
            })
            .map(|_| ())
            .map_err(|error| PlaybackError::Backend(error.to_string()))
    }
}

/// Renders `sound` for the default output device and blocks until it has
/// been played.
pub fn play_on_default_device(sound: &Sound, volume: f32) -> Result<(), DeviceError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(DeviceError::NoOutputDevice)?;

    let supported = device.default_output_config()?;
    let channels = supported.channels() as usize;
    let samples = sound.render(supported.sample_rate(), volume);
    let config: cpal::StreamConfig = supported.into();

    let mut position = 0usize;
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let remaining = &samples[position.min(samples.len())..];
            position += crate::mixer::spread_mono_to_interleaved(data, remaining, channels);
        },
        |error| log::warn!("Output stream error: {error}"),
        None,
    )?;

    stream.play()?;
    std::thread::sleep(sound.duration + DRAIN_TAIL);
    Ok(())
}
