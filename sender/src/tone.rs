//! Sine tone PCM generation.
//!
//! The payload is computed once per run and reused for every packet; only
//! the header changes between packets.

use std::f64::consts::PI;

/// Builds one packet of 16-bit little-endian sine samples.
///
/// `amplitude` is a fraction of full scale and is clamped into `[0, 1]`.
/// Samples restart at phase zero, so the table is identical for every
/// packet. Each sample is duplicated across all `channels`.
pub fn sine_payload(
    samples_per_packet: usize,
    channels: u16,
    frequency_hz: f64,
    amplitude: f64,
    sample_rate: u32,
) -> Vec<u8> {
    // ---
    let scale = amplitude.clamp(0.0, 1.0) * i16::MAX as f64;
    let step = 2.0 * PI * frequency_hz / sample_rate as f64;

    let mut payload = Vec::with_capacity(samples_per_packet * channels as usize * 2);
    for i in 0..samples_per_packet {
        // Truncates toward zero
        let sample = ((step * i as f64).sin() * scale) as i16;
        for _ in 0..channels {
            payload.extend_from_slice(&sample.to_le_bytes());
        }
    }

    payload
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn samples(payload: &[u8]) -> Vec<i16> {
        payload
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_payload_length() {
        // ---
        assert_eq!(sine_payload(882, 1, 1000.0, 0.8, 44_100).len(), 1764);
        assert_eq!(sine_payload(480, 2, 1000.0, 0.8, 48_000).len(), 1920);
    }

    #[test]
    fn test_quarter_period_peak() {
        // ---
        // 1 kHz at 4 kHz: samples at 0, 90, 180, 270 degrees
        let pcm = samples(&sine_payload(4, 1, 1000.0, 1.0, 4_000));

        assert_eq!(pcm[0], 0);
        assert_eq!(pcm[1], i16::MAX);
        assert!(pcm[2].abs() <= 1);
        assert_eq!(pcm[3], -i16::MAX);
    }

    #[test]
    fn test_amplitude_clamped_to_full_scale() {
        // ---
        let clamped = sine_payload(64, 1, 440.0, 3.0, 8_000);
        let full = sine_payload(64, 1, 440.0, 1.0, 8_000);
        assert_eq!(clamped, full);

        let silent = sine_payload(64, 1, 440.0, -1.0, 8_000);
        assert!(silent.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_channels_duplicate_sample() {
        // ---
        let pcm = samples(&sine_payload(16, 2, 440.0, 0.5, 8_000));
        for frame in pcm.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn test_deterministic() {
        // ---
        assert_eq!(
            sine_payload(882, 1, 1000.0, 0.8, 44_100),
            sine_payload(882, 1, 1000.0, 0.8, 44_100)
        );
    }
}
