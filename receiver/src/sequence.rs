//! Sequence-based loss accounting.
//!
//! Every deviation from `last + 1` counts as `(seq - expected) mod 2^32`
//! lost packets. Duplicates and reordering are deliberately not told apart
//! from loss: a late packet shows up as a huge modular gap. Downstream
//! statistics depend on this definition.

use std::time::Instant;
use tracing::warn;

/// Outcome of feeding one sequence number to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    /// First packet of the stream, accepted unconditionally.
    First,

    /// Exactly the expected successor.
    InOrder,

    /// Anything else, folded into the lost counter.
    Gap { expected: u32, got: u32, lost: u32 },
}

/// Throughput figures derived from the tracker at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSnapshot {
    // ---
    /// Packets received since the previous report
    pub window_received: u64,

    pub total_received: u64,
    pub total_lost: u64,

    /// Payload bits per second since the tracker was created
    pub bitrate_bps: f64,

    /// Packets per second since the tracker was created
    pub packet_rate: f64,
}

/// Receiver-side sequence state.
///
/// Mutated only through [`update`](Self::update); lives as long as the
/// receive loop.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    // ---
    last_seq: Option<u32>,
    lost_count: u64,
    received_count: u64,
    bytes_total: u64,
    window_received: u64,
    start_time: Instant,
}

impl SequenceTracker {
    // ---
    pub fn new() -> Self {
        // ---
        Self::starting_at(Instant::now())
    }

    /// Creates a tracker whose rate calculations start at `start`.
    pub fn starting_at(start: Instant) -> Self {
        // ---
        Self {
            last_seq: None,
            lost_count: 0,
            received_count: 0,
            bytes_total: 0,
            window_received: 0,
            start_time: start,
        }
    }

    /// Records a received packet.
    ///
    /// # Arguments
    ///
    /// * `seq` - Sequence number from the packet header
    /// * `payload_len` - PCM payload length in bytes
    pub fn update(&mut self, seq: u32, payload_len: usize) -> SequenceEvent {
        // ---
        let event = match self.last_seq {
            None => SequenceEvent::First,
            Some(last) => {
                let expected = last.wrapping_add(1);
                if seq == expected {
                    SequenceEvent::InOrder
                } else {
                    let lost = seq.wrapping_sub(expected);
                    self.lost_count += lost as u64;
                    warn!(
                        "Sequence gap: expected {} got {} (lost {})",
                        expected, seq, lost
                    );
                    SequenceEvent::Gap {
                        expected,
                        got: seq,
                        lost,
                    }
                }
            }
        };

        self.last_seq = Some(seq);
        self.received_count += 1;
        self.window_received += 1;
        self.bytes_total += payload_len as u64;

        event
    }

    pub fn last_seq(&self) -> Option<u32> {
        // ---
        self.last_seq
    }

    pub fn lost_count(&self) -> u64 {
        // ---
        self.lost_count
    }

    pub fn received_count(&self) -> u64 {
        // ---
        self.received_count
    }

    pub fn bytes_total(&self) -> u64 {
        // ---
        self.bytes_total
    }

    /// Computes throughput as of `now` without resetting anything.
    pub fn snapshot(&self, now: Instant) -> ThroughputSnapshot {
        // ---
        let elapsed = now.saturating_duration_since(self.start_time).as_secs_f64();
        let (bitrate_bps, packet_rate) = if elapsed > 0.0 {
            (
                self.bytes_total as f64 * 8.0 / elapsed,
                self.received_count as f64 / elapsed,
            )
        } else {
            (0.0, 0.0)
        };

        ThroughputSnapshot {
            window_received: self.window_received,
            total_received: self.received_count,
            total_lost: self.lost_count,
            bitrate_bps,
            packet_rate,
        }
    }

    /// Snapshot, then start a new report window.
    ///
    /// Only the per-window received count is reset; cumulative totals stay.
    pub fn take_window(&mut self, now: Instant) -> ThroughputSnapshot {
        // ---
        let snapshot = self.snapshot(now);
        self.window_received = 0;
        snapshot
    }
}

impl Default for SequenceTracker {
    fn default() -> Self {
        // ---
        Self::new()
    }
}
