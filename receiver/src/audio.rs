//! Audio playback using cpal.
//!
//! The output stream runs on its own thread because cpal streams are not
//! `Send` on every platform. The device pulls audio through a
//! [`PlaybackFeeder`] from inside its real-time callback; nothing on that
//! path blocks.

use std::str::FromStr;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, Stream, StreamConfig};
use crossbeam_channel::{bounded, RecvTimeoutError};
use tone_stream_common::{ShutdownFlag, StreamFormat};
use tracing::{debug, info, warn};

use crate::playback::PlaybackFeeder;

/// How long `start` waits for the device to open.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// How often the audio thread checks its stop flag.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Which output device to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Position in the host's output device list
    Index(usize),

    /// Case-insensitive substring of the device name
    Name(String),
}

impl FromStr for DeviceSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        Ok(match s.parse::<usize>() {
            Ok(index) => DeviceSelector::Index(index),
            Err(_) => DeviceSelector::Name(s.to_string()),
        })
    }
}

/// Audio player for real-time PCM playback.
///
/// Dropping the player asks the audio thread to stop but does not wait;
/// call [`stop`](Self::stop) for a bounded teardown.
pub struct AudioPlayer {
    // ---
    stop: ShutdownFlag,
    done_rx: crossbeam_channel::Receiver<()>,
    thread: Option<JoinHandle<()>>,
    device_name: String,
}

impl AudioPlayer {
    // ---
    /// Opens the output device and starts pulling from `feeder`.
    ///
    /// The jitter buffer behind `feeder` should already be prefilled, since
    /// the first callback can arrive before this returns.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No matching output device is available
    /// - The device rejects the stream configuration
    /// - The device does not start within a few seconds
    pub fn start(
        format: StreamFormat,
        device: Option<&DeviceSelector>,
        feeder: PlaybackFeeder,
    ) -> Result<Self> {
        // ---
        info!("Initializing audio playback");

        let stop = ShutdownFlag::new();
        let (ready_tx, ready_rx) = bounded::<Result<String, String>>(1);
        let (done_tx, done_rx) = bounded::<()>(1);

        let thread_stop = stop.clone();
        let selector = device.cloned();
        let thread = std::thread::Builder::new()
            .name("audio-render".into())
            .spawn(move || {
                let (stream, name) = match open_stream(format, selector.as_ref(), feeder) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("{e:#}")));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(name));

                while !thread_stop.is_triggered() {
                    std::thread::sleep(STOP_POLL);
                }

                drop(stream);
                let _ = done_tx.send(());
            })
            .context("failed to spawn audio thread")?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(device_name)) => {
                info!("Audio playback started on {}", device_name);
                Ok(Self {
                    stop,
                    done_rx,
                    thread: Some(thread),
                    device_name,
                })
            }
            Ok(Err(msg)) => {
                let _ = thread.join();
                Err(anyhow!(msg))
            }
            Err(_) => {
                stop.trigger();
                Err(anyhow!(
                    "audio device did not start within {:?}",
                    STARTUP_TIMEOUT
                ))
            }
        }
    }

    /// Name of the device being played to.
    pub fn device_name(&self) -> &str {
        // ---
        &self.device_name
    }

    /// Stops playback, waiting at most `window` for the audio thread.
    ///
    /// Returns `false` if the thread had to be detached.
    pub fn stop(mut self, window: Duration) -> bool {
        // ---
        self.stop.trigger();

        match self.done_rx.recv_timeout(window) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    let _ = thread.join();
                }
                info!("Audio playback stopped");
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Audio thread did not stop within {:?}; detaching", window);
                false
            }
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        // ---
        self.stop.trigger();
    }
}

/// Picks the output device named by `selector`, or the host default.
fn select_device(host: &Host, selector: Option<&DeviceSelector>) -> Result<Device> {
    // ---
    match selector {
        None => host
            .default_output_device()
            .context("no output device available"),
        Some(DeviceSelector::Index(index)) => host
            .output_devices()
            .context("failed to list output devices")?
            .nth(*index)
            .with_context(|| format!("no output device at index {index}")),
        Some(DeviceSelector::Name(name)) => {
            let wanted = name.to_lowercase();
            host.output_devices()
                .context("failed to list output devices")?
                .find(|d| {
                    d.name()
                        .map(|n| n.to_lowercase().contains(&wanted))
                        .unwrap_or(false)
                })
                .with_context(|| format!("no output device matching {name:?}"))
        }
    }
}

/// Builds and starts the output stream. Runs on the audio thread.
fn open_stream(
    format: StreamFormat,
    selector: Option<&DeviceSelector>,
    mut feeder: PlaybackFeeder,
) -> Result<(Stream, String)> {
    // ---
    let host = cpal::default_host();
    let device = select_device(&host, selector)?;
    let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

    let config = StreamConfig {
        channels: format.channels,
        sample_rate: cpal::SampleRate(format.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    debug!("Stream config: {:?}", config);

    let mut scratch: Vec<u8> = Vec::with_capacity(16 * 1024);
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                render_i16(&mut feeder, &mut scratch, data);
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )
        .context("failed to build output stream")?;

    stream.play().context("failed to start audio stream")?;

    Ok((stream, name))
}

/// Render callback body: one byte request per callback, decoded to samples.
///
/// The byte count is the interleaved sample count times the sample width,
/// i.e. frames × bytes-per-frame.
pub(crate) fn render_i16(feeder: &mut PlaybackFeeder, scratch: &mut Vec<u8>, data: &mut [i16]) {
    // ---
    scratch.resize(data.len() * 2, 0);
    feeder.fill(scratch);

    for (sample, bytes) in data.iter_mut().zip(scratch.chunks_exact(2)) {
        *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::jitter_buffer::JitterBuffer;
    use crate::playback::SharedPlaybackCounters;

    #[test]
    fn test_device_selector_parse() {
        // ---
        assert_eq!("3".parse::<DeviceSelector>(), Ok(DeviceSelector::Index(3)));
        assert_eq!(
            "USB Audio".parse::<DeviceSelector>(),
            Ok(DeviceSelector::Name("USB Audio".into()))
        );
    }

    #[test]
    fn test_render_decodes_little_endian() {
        // ---
        let buffer = JitterBuffer::default();
        let counters = SharedPlaybackCounters::new();
        let mut feeder = PlaybackFeeder::new(buffer.clone(), counters.clone());

        let mut chunk = Vec::new();
        for s in [1i16, -2, i16::MAX, i16::MIN] {
            chunk.extend_from_slice(&s.to_le_bytes());
        }
        buffer.push(chunk);

        let mut scratch = Vec::new();
        let mut data = [7i16; 6];
        render_i16(&mut feeder, &mut scratch, &mut data);

        assert_eq!(data, [1, -2, i16::MAX, i16::MIN, 0, 0]);
        assert_eq!(counters.peek().underflow_count, 1);
    }

    #[test]
    fn test_audio_player_creation() {
        // ---
        // Requires an audio device, so it may fail in CI
        let feeder = PlaybackFeeder::new(JitterBuffer::default(), SharedPlaybackCounters::new());
        let format = StreamFormat::new(44_100, 1).unwrap();

        match AudioPlayer::start(format, None, feeder) {
            Ok(player) => assert!(player.stop(Duration::from_secs(2))),
            Err(e) => println!("Skipping: no audio device available ({e:#})"),
        }
    }
}
