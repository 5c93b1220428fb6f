//! PCM stream format arithmetic.
//!
//! All audio on the wire is signed 16-bit, interleaved per channel. These
//! helpers convert between durations, sample counts and byte counts so that
//! sender and receiver size packets and buffers the same way.

use std::time::Duration;

use crate::error::ConfigError;

/// Bytes per sample (16-bit PCM).
pub const SAMPLE_WIDTH_BYTES: usize = 2;

/// Validated sample rate / channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    // ---
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    // ---
    /// Validates raw CLI values into a stream format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either value is non-positive or out of range.
    pub fn new(sample_rate: i64, channels: i64) -> Result<Self, ConfigError> {
        // ---
        if sample_rate <= 0 {
            return Err(ConfigError::NonPositiveSampleRate(sample_rate));
        }
        if channels <= 0 {
            return Err(ConfigError::NonPositiveChannels(channels));
        }

        let sample_rate =
            u32::try_from(sample_rate).map_err(|_| ConfigError::SampleRateTooLarge(sample_rate))?;
        let channels =
            u16::try_from(channels).map_err(|_| ConfigError::TooManyChannels(channels))?;

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Size of one time-aligned frame (one sample on every channel).
    pub fn bytes_per_frame(&self) -> usize {
        // ---
        SAMPLE_WIDTH_BYTES * self.channels as usize
    }

    /// Number of frames covering `ms` milliseconds, rounded to nearest.
    pub fn frames_for_ms(&self, ms: f64) -> usize {
        // ---
        let frames = (self.sample_rate as f64 * (ms / 1000.0)).round();
        if frames <= 0.0 {
            0
        } else {
            frames as usize
        }
    }

    /// Duration of `frames` frames in milliseconds.
    pub fn ms_for_frames(&self, frames: usize) -> f64 {
        // ---
        // Multiply first so whole-millisecond depths come out exact
        frames as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Byte length of `frames` frames of interleaved PCM.
    ///
    /// Callers size frames through validated settings; use
    /// [`checked_bytes_for_frames`](Self::checked_bytes_for_frames) on raw input.
    pub fn bytes_for_frames(&self, frames: usize) -> usize {
        // ---
        frames * self.bytes_per_frame()
    }

    /// Byte length of `frames` frames, or `None` on overflow.
    pub fn checked_bytes_for_frames(&self, frames: usize) -> Option<usize> {
        // ---
        frames.checked_mul(self.bytes_per_frame())
    }
}

/// Converts a positive millisecond count into a [`Duration`].
pub fn duration_from_ms(ms: f64) -> Duration {
    // ---
    Duration::from_secs_f64(ms.max(0.0) / 1000.0)
}
