//! Receiver settings validation.

use std::time::Duration;

use tone_stream_common::{ConfigError, StreamFormat, HEADER_LEN};

/// Jitter queue capacity in chunks.
pub const QUEUE_CAPACITY: usize = 64;

/// How long the receive path waits for queue space before dropping a chunk.
pub const PUSH_TIMEOUT: Duration = Duration::from_millis(50);

/// Socket receive timeout; also bounds shutdown latency.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Interval between statistics reports.
pub const REPORT_PERIOD: Duration = Duration::from_secs(5);

/// Time the audio thread is given to stop before it is detached.
pub const AUDIO_TEARDOWN: Duration = Duration::from_secs(2);

/// Minimum frames per prefill silence chunk. Deeper buffers use larger
/// chunks so the whole prefill fits in [`QUEUE_CAPACITY`] chunks.
pub const SILENCE_CHUNK_FRAMES: usize = 256;

/// Largest payload accepted, in frames.
const MAX_PAYLOAD_FRAMES: usize = 2048;

/// Validated receiver configuration derived from the command line.
#[derive(Debug, Clone)]
pub struct ReceiverSettings {
    // ---
    pub listen_port: u16,

    pub format: StreamFormat,

    /// Requested jitter depth in milliseconds
    pub jitter_ms: f64,

    /// Jitter depth in frames, `round(sample_rate * jitter_ms / 1000)`
    pub jitter_buffer_samples: usize,
}

impl ReceiverSettings {
    // ---
    /// Validates raw CLI values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the sample rate or channel count is
    /// non-positive, the jitter depth is not finite, rounds to zero samples
    /// or is too large to size in bytes.
    pub fn new(
        listen_port: u16,
        sample_rate: i64,
        channels: i64,
        jitter_ms: f64,
    ) -> Result<Self, ConfigError> {
        // ---
        let format = StreamFormat::new(sample_rate, channels)?;

        if !jitter_ms.is_finite() {
            return Err(ConfigError::NonFiniteDuration(jitter_ms));
        }

        let jitter_buffer_samples = format.frames_for_ms(jitter_ms);
        if jitter_buffer_samples == 0 {
            return Err(ConfigError::EmptyJitterBuffer(jitter_ms));
        }
        if format
            .checked_bytes_for_frames(jitter_buffer_samples)
            .is_none()
        {
            return Err(ConfigError::JitterBufferTooLarge(jitter_ms));
        }

        Ok(Self {
            listen_port,
            format,
            jitter_ms,
            jitter_buffer_samples,
        })
    }

    /// Silence queued before playback starts.
    pub fn target_buffer_bytes(&self) -> usize {
        // ---
        self.format.bytes_for_frames(self.jitter_buffer_samples)
    }

    /// Size of each prefill chunk.
    ///
    /// At least [`SILENCE_CHUNK_FRAMES`] frames, and large enough that
    /// [`target_buffer_bytes`](Self::target_buffer_bytes) fits in
    /// [`QUEUE_CAPACITY`] chunks.
    pub fn silence_chunk_bytes(&self) -> usize {
        // ---
        let frames = self
            .jitter_buffer_samples
            .div_ceil(QUEUE_CAPACITY)
            .max(SILENCE_CHUNK_FRAMES);
        self.format.bytes_for_frames(frames)
    }

    /// Configured depth as reported in statistics.
    pub fn buffer_depth_ms(&self) -> f64 {
        // ---
        self.format.ms_for_frames(self.jitter_buffer_samples)
    }

    /// Receive buffer size: header plus the largest payload we accept.
    pub fn max_datagram_len(&self) -> usize {
        // ---
        HEADER_LEN + self.format.bytes_for_frames(MAX_PAYLOAD_FRAMES)
    }
}
