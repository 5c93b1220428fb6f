//! Tone Stream Receiver Library
//!
//! Depacketizes the tone stream, accounts for loss, absorbs jitter in a
//! bounded buffer and feeds a real-time audio sink while reporting
//! transport statistics.

pub mod audio;
pub mod capture;
pub mod config;
pub mod jitter_buffer;
pub mod network;
pub mod playback;
pub mod sequence;
pub mod stats;

pub use audio::{AudioPlayer, DeviceSelector};
pub use capture::WavCapture;
pub use config::ReceiverSettings;
pub use jitter_buffer::{JitterBuffer, JitterBufferConfig, PushOutcome};
pub use network::{ReceiveEvent, ToneReceiver};
pub use playback::{PlaybackCounters, PlaybackFeeder, SharedPlaybackCounters};
pub use sequence::{SequenceEvent, SequenceTracker};
pub use stats::{StatsReporter, StatsSummary};

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::runtime::{Handle, RuntimeFlavor};
use tone_stream_common::{MetricsContext, PacketHeader, ShutdownFlag};
use tracing::{info, warn};

/// Playback capability, decided once at startup.
pub enum PlaybackMode {
    /// Audio sink running; packets are queued for it.
    Enabled(ActivePlayback),

    /// No audio output; only statistics (and optional capture).
    StatsOnly,
}

/// Handles owned while playback is enabled.
pub struct ActivePlayback {
    // ---
    pub player: AudioPlayer,
    pub buffer: JitterBuffer,
    pub counters: SharedPlaybackCounters,
}

impl PlaybackMode {
    // ---
    /// Resolves the playback mode.
    ///
    /// With `no_audio` the receiver runs stats-only. Otherwise the jitter
    /// buffer is prefilled with silence and the audio sink is started; if
    /// the sink cannot be opened the receiver degrades to stats-only with a
    /// warning rather than failing.
    pub fn resolve(
        settings: &ReceiverSettings,
        no_audio: bool,
        device: Option<&DeviceSelector>,
    ) -> Self {
        // ---
        if no_audio {
            info!("Audio playback disabled (--no-audio)");
            return PlaybackMode::StatsOnly;
        }

        let buffer = JitterBuffer::new(JitterBufferConfig::default());
        buffer.prefill(settings.target_buffer_bytes(), settings.silence_chunk_bytes());

        let counters = SharedPlaybackCounters::new();
        let feeder = PlaybackFeeder::new(buffer.clone(), counters.clone());

        match AudioPlayer::start(settings.format, device, feeder) {
            Ok(player) => PlaybackMode::Enabled(ActivePlayback {
                player,
                buffer,
                counters,
            }),
            Err(e) => {
                warn!("Audio output unavailable ({e:#}); running without audio output");
                PlaybackMode::StatsOnly
            }
        }
    }

    /// Queue the receive loop should feed, if any.
    pub fn buffer(&self) -> Option<JitterBuffer> {
        // ---
        match self {
            PlaybackMode::Enabled(active) => Some(active.buffer.clone()),
            PlaybackMode::StatsOnly => None,
        }
    }

    /// Render counters the reporter should sample, if any.
    pub fn counters(&self) -> Option<SharedPlaybackCounters> {
        // ---
        match self {
            PlaybackMode::Enabled(active) => Some(active.counters.clone()),
            PlaybackMode::StatsOnly => None,
        }
    }

    /// Stops the audio sink, waiting at most `window`.
    pub fn shutdown(self, window: Duration) {
        // ---
        if let PlaybackMode::Enabled(active) = self {
            active.player.stop(window);
        }
    }
}

/// Per-run receive state: loss accounting, reporting and packet sinks.
pub struct ReceiveSession {
    // ---
    pub tracker: SequenceTracker,
    pub reporter: StatsReporter,
    buffer: Option<JitterBuffer>,
    capture: Option<WavCapture>,
}

impl ReceiveSession {
    // ---
    /// Creates a session.
    ///
    /// # Arguments
    ///
    /// * `settings` - Validated receiver settings
    /// * `buffer` - Jitter buffer to feed; `None` in stats-only mode
    /// * `counters` - Render counters to report; `None` in stats-only mode
    /// * `capture` - Optional WAV capture
    pub fn new(
        settings: &ReceiverSettings,
        buffer: Option<JitterBuffer>,
        counters: Option<SharedPlaybackCounters>,
        capture: Option<WavCapture>,
    ) -> Self {
        // ---
        Self {
            tracker: SequenceTracker::new(),
            reporter: StatsReporter::new(
                config::REPORT_PERIOD,
                settings.buffer_depth_ms(),
                counters,
            ),
            buffer,
            capture,
        }
    }

    /// Replaces the reporter, e.g. to shorten the report period.
    pub fn with_reporter(mut self, reporter: StatsReporter) -> Self {
        // ---
        self.reporter = reporter;
        self
    }

    /// Accounts for one packet, captures it and queues it for playback.
    ///
    /// # Errors
    ///
    /// Returns error only if writing the WAV capture fails.
    pub fn handle_packet(
        &mut self,
        header: PacketHeader,
        payload: Vec<u8>,
        metrics: &MetricsContext,
    ) -> Result<()> {
        // ---
        let event = self.tracker.update(header.sequence, payload.len());
        if let SequenceEvent::Gap { lost, .. } = event {
            metrics.packets_lost_total.inc_by(lost as u64);
        }
        metrics.packets_received_total.inc();
        metrics.bytes_received_total.inc_by(payload.len() as u64);

        if let Some(capture) = self.capture.as_mut() {
            capture.append(&payload)?;
        }

        if let Some(buffer) = &self.buffer {
            if queue_chunk(buffer, payload) == PushOutcome::Dropped {
                metrics.backpressure_drops_total.inc();
                warn!("Playback queue full; dropping audio chunk");
            }
        }

        Ok(())
    }

    /// Emits a report if one is due and mirrors it into the metrics.
    pub fn maybe_report(&mut self, now: Instant, metrics: &MetricsContext) -> Option<StatsSummary> {
        // ---
        let summary = self.reporter.maybe_report(now, &mut self.tracker)?;
        mirror_playback(&summary, metrics);
        Some(summary)
    }

    /// Emits a report unconditionally, e.g. on shutdown.
    pub fn report_now(&mut self, now: Instant, metrics: &MetricsContext) -> StatsSummary {
        // ---
        let summary = self.reporter.report(now, &mut self.tracker);
        mirror_playback(&summary, metrics);
        summary
    }

    /// Finalizes the WAV capture, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the capture cannot be flushed.
    pub fn finish(self) -> Result<()> {
        // ---
        match self.capture {
            Some(capture) => capture.finalize(),
            None => Ok(()),
        }
    }
}

/// Queues a chunk without stalling the async runtime.
///
/// The fast path never waits. When the queue is full the bounded wait runs
/// under `block_in_place` on a multi-thread runtime so other tasks keep
/// their worker; a current-thread runtime has no other worker to hand over
/// to, so there the wait (at most the push timeout) happens inline.
fn queue_chunk(buffer: &JitterBuffer, chunk: Vec<u8>) -> PushOutcome {
    // ---
    let chunk = match buffer.try_push(chunk) {
        Ok(()) => return PushOutcome::Queued,
        Err(chunk) => chunk,
    };

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| buffer.push(chunk))
        }
        _ => buffer.push(chunk),
    }
}

fn mirror_playback(summary: &StatsSummary, metrics: &MetricsContext) {
    // ---
    if let Some(playback) = summary.playback {
        metrics
            .playback_underflows_total
            .inc_by(playback.underflow_count as u64);
        metrics
            .jitter_queue_max_depth_chunks
            .set(playback.max_observed_depth as i64);
    }
}

/// Runs the receive loop until `shutdown` is triggered.
///
/// Each iteration waits at most the receiver's timeout for a datagram, so
/// reports and the stop flag are checked at least once per timeout even
/// when the stream is silent. Undersized datagrams and socket errors are
/// logged and skipped. A final report is emitted once the loop stops.
///
/// # Errors
///
/// Returns error if writing the WAV capture fails.
pub async fn receive_loop(
    receiver: &mut ToneReceiver,
    session: &mut ReceiveSession,
    metrics: &MetricsContext,
    shutdown: &ShutdownFlag,
) -> Result<()> {
    // ---
    while !shutdown.is_triggered() {
        match receiver.receive().await {
            Ok(ReceiveEvent::Packet {
                header, payload, ..
            }) => session.handle_packet(header, payload, metrics)?,
            Ok(ReceiveEvent::Undersized { .. }) => metrics.undersized_packets_total.inc(),
            Ok(ReceiveEvent::TimedOut) => {}
            Err(e) => warn!("{e:#}"),
        }

        session.maybe_report(Instant::now(), metrics);
    }

    info!("Receive loop stopped");
    session.report_now(Instant::now(), metrics);
    Ok(())
}
