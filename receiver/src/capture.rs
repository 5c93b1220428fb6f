//! Optional WAV capture of the received stream.
//!
//! Payloads are appended exactly as they arrive: no reordering, no loss
//! compensation.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use tone_stream_common::StreamFormat;
use tracing::info;

/// Buffered WAV writer matching the configured stream format.
pub struct WavCapture {
    // ---
    writer: WavWriter<BufWriter<File>>,
    path: PathBuf,
    samples_written: u64,
    channels: u16,
}

impl WavCapture {
    // ---
    /// Creates (or truncates) the WAV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>, format: StreamFormat) -> Result<Self> {
        // ---
        let path = path.as_ref().to_path_buf();
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(&path, spec)
            .with_context(|| format!("failed to create WAV file: {}", path.display()))?;
        info!("Capturing stream to {}", path.display());

        Ok(Self {
            writer,
            path,
            samples_written: 0,
            channels: format.channels,
        })
    }

    /// Appends one payload of little-endian i16 samples.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying write fails.
    pub fn append(&mut self, payload: &[u8]) -> Result<()> {
        // ---
        for bytes in payload.chunks_exact(2) {
            self.writer
                .write_sample(i16::from_le_bytes([bytes[0], bytes[1]]))
                .with_context(|| format!("failed to write {}", self.path.display()))?;
            self.samples_written += 1;
        }
        Ok(())
    }

    /// Complete frames appended so far.
    ///
    /// Counted from the running sample total, so payloads that split a
    /// frame do not lose samples from the count.
    pub fn frames_written(&self) -> u64 {
        // ---
        self.samples_written / self.channels.max(1) as u64
    }

    /// Flushes buffered data and patches the WAV header.
    ///
    /// # Errors
    ///
    /// Returns error if the final flush fails.
    pub fn finalize(self) -> Result<()> {
        // ---
        let frames = self.frames_written();
        let path = self.path.clone();
        self.writer
            .finalize()
            .with_context(|| format!("failed to finalize {}", path.display()))?;
        info!("Wrote {} frames to {}", frames, path.display());
        Ok(())
    }
}
