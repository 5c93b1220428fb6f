//! Error taxonomy shared by both ends of the stream.

use thiserror::Error;

use crate::packet::HEADER_LEN;

/// Wire format violations detected while decoding a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The datagram does not carry any payload past the fixed header.
    #[error("undersized packet: {len} bytes (header alone is {HEADER_LEN})")]
    Undersized { len: usize },
}

/// Invalid command-line parameters. Always fatal, detected before any loop starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive (got {0})")]
    NonPositiveSampleRate(i64),

    #[error("channel count must be positive (got {0})")]
    NonPositiveChannels(i64),

    #[error("packet duration must be positive (got {0} ms)")]
    NonPositivePacketDuration(f64),

    #[error("computed samples per packet is zero; check sample rate / packet duration")]
    EmptyPacket,

    #[error("jitter buffer of {0} ms must hold at least one sample")]
    EmptyJitterBuffer(f64),

    #[error("sample rate {0} does not fit in 32 bits")]
    SampleRateTooLarge(i64),

    #[error("channel count {0} does not fit in 16 bits")]
    TooManyChannels(i64),

    #[error("duration must be a finite number of milliseconds (got {0})")]
    NonFiniteDuration(f64),

    #[error("datagram of {len} bytes exceeds the UDP limit of {max} bytes")]
    DatagramTooLarge { len: usize, max: usize },

    #[error("jitter buffer of {0} ms is too large")]
    JitterBufferTooLarge(f64),
}
