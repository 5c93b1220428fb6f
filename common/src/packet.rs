//! Tone stream packet format.
//!
//! Every UDP datagram carries a fixed 12-byte header followed by raw PCM.
//! There is no checksum; transport integrity is left to UDP.
//!
//! # Wire Format
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        sequence number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         sample counter                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     send timestamp (us)                       |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! |            PCM payload (i16 little-endian, interleaved)       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Header fields are big-endian and wrap modulo 2^32.

use crate::error::FormatError;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 12;

/// Largest UDP payload over IPv4 (65535 minus IP and UDP headers).
pub const MAX_DATAGRAM_LEN: usize = 65_507;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    // ---
    /// Packet sequence number, +1 per packet
    pub sequence: u32,

    /// Cumulative sample count at the start of this packet
    pub sample_counter: u32,

    /// Wall-clock send time in microseconds, truncated to 32 bits
    pub timestamp_us: u32,
}

impl PacketHeader {
    // ---
    pub fn new(sequence: u32, sample_counter: u32, timestamp_us: u32) -> Self {
        // ---
        Self {
            sequence,
            sample_counter,
            timestamp_us,
        }
    }
}

/// Encodes a header and payload into a fresh datagram.
///
/// The payload length is not checked; callers send a fixed-size payload
/// for the life of the stream.
pub fn encode(header: &PacketHeader, payload: &[u8]) -> Vec<u8> {
    // ---
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    encode_into(header, payload, &mut buf);
    buf
}

/// Encodes into a caller-owned buffer, replacing its contents.
///
/// Lets the sender reuse one allocation for every packet.
pub fn encode_into(header: &PacketHeader, payload: &[u8], buf: &mut Vec<u8>) {
    // ---
    buf.clear();
    buf.extend_from_slice(&header.sequence.to_be_bytes());
    buf.extend_from_slice(&header.sample_counter.to_be_bytes());
    buf.extend_from_slice(&header.timestamp_us.to_be_bytes());
    buf.extend_from_slice(payload);
}

/// Splits a datagram into its header and borrowed payload.
///
/// # Errors
///
/// Returns [`FormatError::Undersized`] when the datagram is not longer
/// than the header.
pub fn decode(data: &[u8]) -> Result<(PacketHeader, &[u8]), FormatError> {
    // ---
    if data.len() <= HEADER_LEN {
        return Err(FormatError::Undersized { len: data.len() });
    }

    let (head, payload) = data.split_at(HEADER_LEN);
    let header = PacketHeader {
        sequence: u32::from_be_bytes([head[0], head[1], head[2], head[3]]),
        sample_counter: u32::from_be_bytes([head[4], head[5], head[6], head[7]]),
        timestamp_us: u32::from_be_bytes([head[8], head[9], head[10], head[11]]),
    };

    Ok((header, payload))
}
