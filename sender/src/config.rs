//! Sender settings validation.

use std::net::SocketAddr;
use std::time::Duration;

use tone_stream_common::format::duration_from_ms;
use tone_stream_common::{ConfigError, StreamFormat, HEADER_LEN, MAX_DATAGRAM_LEN};

/// Validated sender configuration.
///
/// Built once from the command line before any socket is opened; every
/// field is fixed for the life of the stream.
#[derive(Debug, Clone)]
pub struct ToneSettings {
    // ---
    /// Where datagrams are sent
    pub destination: SocketAddr,

    pub format: StreamFormat,

    /// Tone frequency in Hz
    pub frequency_hz: f64,

    /// Fraction of full scale, clamped into `[0, 1]`
    pub amplitude: f64,

    /// PCM frames carried by every packet
    pub samples_per_packet: usize,

    /// Packet duration in milliseconds
    pub packet_ms: f64,
}

impl ToneSettings {
    // ---
    /// Validates raw CLI values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the sample rate, channel count or packet
    /// duration is non-positive, the duration is not finite, or the packet
    /// would hold zero samples or not fit in one UDP datagram.
    pub fn new(
        destination: SocketAddr,
        frequency_hz: f64,
        amplitude: f64,
        sample_rate: i64,
        channels: i64,
        packet_ms: f64,
    ) -> Result<Self, ConfigError> {
        // ---
        let format = StreamFormat::new(sample_rate, channels)?;

        if !packet_ms.is_finite() {
            return Err(ConfigError::NonFiniteDuration(packet_ms));
        }
        if packet_ms <= 0.0 {
            return Err(ConfigError::NonPositivePacketDuration(packet_ms));
        }

        let samples_per_packet = format.frames_for_ms(packet_ms);
        if samples_per_packet == 0 {
            return Err(ConfigError::EmptyPacket);
        }

        let datagram_len = format
            .checked_bytes_for_frames(samples_per_packet)
            .and_then(|payload| payload.checked_add(HEADER_LEN))
            .unwrap_or(usize::MAX);
        if datagram_len > MAX_DATAGRAM_LEN {
            return Err(ConfigError::DatagramTooLarge {
                len: datagram_len,
                max: MAX_DATAGRAM_LEN,
            });
        }

        Ok(Self {
            destination,
            format,
            frequency_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
            samples_per_packet,
            packet_ms,
        })
    }

    /// PCM payload length in bytes.
    pub fn payload_len(&self) -> usize {
        // ---
        self.format.bytes_for_frames(self.samples_per_packet)
    }

    /// Full datagram length (header + payload).
    pub fn datagram_len(&self) -> usize {
        // ---
        HEADER_LEN + self.payload_len()
    }

    /// Transmission cadence.
    pub fn packet_interval(&self) -> Duration {
        // ---
        duration_from_ms(self.packet_ms)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn dest() -> SocketAddr {
        "127.0.0.1:50005".parse().unwrap()
    }

    #[test]
    fn test_default_sizing() {
        // ---
        let settings = ToneSettings::new(dest(), 1000.0, 0.8, 44_100, 1, 20.0).unwrap();

        assert_eq!(settings.samples_per_packet, 882);
        assert_eq!(settings.payload_len(), 1764);
        assert_eq!(settings.datagram_len(), 1776);
        assert_eq!(settings.packet_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_amplitude_is_clamped() {
        // ---
        let loud = ToneSettings::new(dest(), 1000.0, 1.7, 44_100, 1, 20.0).unwrap();
        let negative = ToneSettings::new(dest(), 1000.0, -0.3, 44_100, 1, 20.0).unwrap();

        assert_eq!(loud.amplitude, 1.0);
        assert_eq!(negative.amplitude, 0.0);
    }

    #[test]
    fn test_rejects_bad_timing() {
        // ---
        assert_eq!(
            ToneSettings::new(dest(), 1000.0, 0.8, 0, 1, 20.0).unwrap_err(),
            ConfigError::NonPositiveSampleRate(0)
        );
        assert_eq!(
            ToneSettings::new(dest(), 1000.0, 0.8, 44_100, 1, -1.0).unwrap_err(),
            ConfigError::NonPositivePacketDuration(-1.0)
        );
        assert!(ToneSettings::new(dest(), 1000.0, 0.8, 44_100, 1, f64::NAN).is_err());
        assert_eq!(
            ToneSettings::new(dest(), 1000.0, 0.8, 44_100, 1, f64::INFINITY).unwrap_err(),
            ConfigError::NonFiniteDuration(f64::INFINITY)
        );

        // 0.01 ms at 8 kHz rounds to zero samples
        assert_eq!(
            ToneSettings::new(dest(), 1000.0, 0.8, 8_000, 1, 0.01).unwrap_err(),
            ConfigError::EmptyPacket
        );
    }

    #[test]
    fn test_stereo_payload() {
        // ---
        let settings = ToneSettings::new(dest(), 440.0, 0.5, 48_000, 2, 10.0).unwrap();
        assert_eq!(settings.samples_per_packet, 480);
        assert_eq!(settings.payload_len(), 1920);
    }

    #[test]
    fn test_rejects_oversized_datagram() {
        // ---
        assert_eq!(
            ToneSettings::new(dest(), 1000.0, 0.8, 44_100, 1, 1000.0).unwrap_err(),
            ConfigError::DatagramTooLarge {
                len: 88_212,
                max: 65_507
            }
        );
        assert!(matches!(
            ToneSettings::new(dest(), 1000.0, 0.8, 44_100, 1, 1e30),
            Err(ConfigError::DatagramTooLarge { .. })
        ));

        // 32747 frames is the largest mono payload that fits
        let edge = ToneSettings::new(dest(), 1000.0, 0.8, 1_000, 1, 32_747.0).unwrap();
        assert_eq!(edge.datagram_len(), 65_506);
        assert!(ToneSettings::new(dest(), 1000.0, 0.8, 1_000, 1, 32_748.0).is_err());
    }
}
