//! Audio cues that accompany dashboard notifications.
//!
//! This crate maps notification severities to short synthesized tones and
//! hands them to a [`cue::SoundPlayer`]. It focuses on:
//! - Resolving a severity to a sound, with `info` as the fallback.
//! - Volume and enable/disable controls that never fail the caller.
//! - Rendering tones to `f32` samples and spreading them over the output
//!   channels of a device.
//!
//! The `device` feature adds a `cpal`-backed player for the default output
//! device. Without it, [`cue::LogPlayer`] records cues in the log only.
//!
//! # Real-time constraints
//! Output callbacks run on a real-time thread. Samples are rendered before
//! the stream is built so the callback only copies from a buffer.

pub mod cue;
#[cfg(feature = "device")]
pub mod device;
pub mod mixer;
pub mod sound;
