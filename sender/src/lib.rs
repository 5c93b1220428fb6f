//! Tone Stream Sender Library
//!
//! Generates a static sine tone, packetizes it into sequenced UDP datagrams
//! and transmits them at a fixed, drift-corrected cadence.

pub mod config;
pub mod network;
pub mod pacer;
pub mod tone;

pub use config::ToneSettings;
pub use network::{SendOutcome, ToneSender};
pub use pacer::{HeaderSequencer, SenderPacer};

use anyhow::Result;
use tone_stream_common::{packet, MetricsContext, ShutdownFlag};
use tracing::info;

/// Totals reported when the stream stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    // ---
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub short_sends: u64,
    pub failed_sends: u64,
}

/// Streams the tone until `shutdown` is triggered.
///
/// The PCM payload is built once; each iteration stamps a fresh header
/// (sequence, cumulative sample count, wall-clock microseconds) and sends
/// one datagram. Send failures and short sends are counted and skipped.
///
/// # Arguments
///
/// * `sender` - UDP socket wrapper
/// * `settings` - Validated stream settings
/// * `metrics` - Process metrics registry
/// * `shutdown` - Cooperative stop flag
///
/// # Errors
///
/// Currently infallible once the socket exists; returns `Result` so the
/// binary can treat it like the rest of its setup.
pub async fn stream_tone(
    sender: &mut ToneSender,
    settings: &ToneSettings,
    metrics: &MetricsContext,
    shutdown: &ShutdownFlag,
) -> Result<StreamSummary> {
    // ---
    let payload = tone::sine_payload(
        settings.samples_per_packet,
        settings.format.channels,
        settings.frequency_hz,
        settings.amplitude,
        settings.format.sample_rate,
    );

    let mut pacer = SenderPacer::new(settings.packet_interval());
    let mut sequencer = HeaderSequencer::new(settings.samples_per_packet);
    let mut datagram = Vec::with_capacity(settings.datagram_len());
    let mut summary = StreamSummary::default();

    info!(
        "Streaming {:.1} Hz tone: {} samples/packet, {} byte payload every {:.1} ms",
        settings.frequency_hz,
        settings.samples_per_packet,
        payload.len(),
        settings.packet_ms
    );

    loop {
        tokio::select! {
            _ = pacer.wait() => {}
            _ = shutdown.triggered() => break,
        }

        let header = sequencer.next_header(pacer::wall_clock_us());
        packet::encode_into(&header, &payload, &mut datagram);

        match sender.send(&datagram).await {
            SendOutcome::Sent(bytes) => {
                summary.packets_sent += 1;
                summary.bytes_sent += bytes as u64;
                metrics.packets_sent_total.inc();
                metrics.bytes_sent_total.inc_by(bytes as u64);
            }
            SendOutcome::Short { sent, .. } => {
                summary.short_sends += 1;
                summary.bytes_sent += sent as u64;
                metrics.short_sends_total.inc();
                metrics.bytes_sent_total.inc_by(sent as u64);
            }
            SendOutcome::Failed => summary.failed_sends += 1,
        }
    }

    info!(
        "Stopped tone stream after {} packets ({} bytes, {} short, {} failed)",
        summary.packets_sent, summary.bytes_sent, summary.short_sends, summary.failed_sends
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tone_stream_common::HEADER_LEN;

    #[tokio::test]
    async fn test_stream_tone_sends_sequenced_packets() {
        // ---
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = listener.local_addr().unwrap();
        let settings = ToneSettings::new(dest, 1000.0, 0.8, 8_000, 1, 5.0).unwrap();

        let mut sender = ToneSender::new(dest, settings.datagram_len()).unwrap();
        let metrics = MetricsContext::new("test").unwrap();
        let shutdown = ShutdownFlag::new();

        let task = {
            let shutdown = shutdown.clone();
            let metrics = metrics.clone();
            let settings = settings.clone();
            tokio::spawn(async move {
                stream_tone(&mut sender, &settings, &metrics, &shutdown).await
            })
        };

        let mut buf = vec![0u8; 2048];
        for expected_seq in 0..5u32 {
            let (len, _) = tokio::time::timeout(Duration::from_secs(2), listener.recv_from(&mut buf))
                .await
                .expect("no packet within 2s")
                .unwrap();
            assert_eq!(len, HEADER_LEN + 80);

            let (header, payload) = packet::decode(&buf[..len]).unwrap();
            assert_eq!(header.sequence, expected_seq);
            assert_eq!(header.sample_counter, expected_seq * 40);
            assert_eq!(payload.len(), 80);
        }

        shutdown.trigger();
        let summary = task.await.unwrap().unwrap();
        assert!(summary.packets_sent >= 5);
        assert_eq!(metrics.packets_sent_total.get(), summary.packets_sent);
    }
}
