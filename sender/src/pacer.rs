//! Packet pacing and header sequencing.
//!
//! Deadlines advance from the previous deadline rather than from "now", so
//! sleep overshoot on one packet is absorbed by the next instead of
//! accumulating as drift.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{sleep_until, Instant};
use tone_stream_common::PacketHeader;

/// Fixed-cadence scheduler on the monotonic clock.
#[derive(Debug, Clone)]
pub struct SenderPacer {
    // ---
    interval: Duration,
    next_deadline: Instant,
}

impl SenderPacer {
    // ---
    /// Creates a pacer whose first deadline is now.
    pub fn new(interval: Duration) -> Self {
        // ---
        Self::starting_at(interval, Instant::now())
    }

    /// Creates a pacer whose first deadline is `start`.
    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        // ---
        Self {
            interval,
            next_deadline: start,
        }
    }

    /// Deadline the next [`wait`](Self::wait) sleeps until.
    pub fn next_deadline(&self) -> Instant {
        // ---
        self.next_deadline
    }

    /// Advances the schedule by one interval and returns the deadline that
    /// was due.
    pub fn advance(&mut self) -> Instant {
        // ---
        let due = self.next_deadline;
        self.next_deadline += self.interval;
        due
    }

    /// Sleeps until the current deadline, then schedules the next one.
    ///
    /// Returns immediately when running behind, letting the loop catch up.
    pub async fn wait(&mut self) {
        // ---
        let due = self.advance();
        sleep_until(due).await;
    }
}

/// Produces consecutive packet headers with 32-bit wraparound.
#[derive(Debug, Clone)]
pub struct HeaderSequencer {
    // ---
    sequence: u32,
    sample_counter: u32,
    samples_per_packet: u32,
}

impl HeaderSequencer {
    // ---
    pub fn new(samples_per_packet: usize) -> Self {
        // ---
        Self::starting_at(0, 0, samples_per_packet)
    }

    pub fn starting_at(sequence: u32, sample_counter: u32, samples_per_packet: usize) -> Self {
        // ---
        Self {
            sequence,
            sample_counter,
            // Only the low 32 bits matter for a counter that wraps mod 2^32
            samples_per_packet: samples_per_packet as u32,
        }
    }

    /// Returns the header for the next packet and advances both counters.
    pub fn next_header(&mut self, timestamp_us: u32) -> PacketHeader {
        // ---
        let header = PacketHeader::new(self.sequence, self.sample_counter, timestamp_us);
        self.sequence = self.sequence.wrapping_add(1);
        self.sample_counter = self.sample_counter.wrapping_add(self.samples_per_packet);
        header
    }
}

/// Wall-clock time in microseconds since the Unix epoch, truncated to 32 bits.
pub fn wall_clock_us() -> u32 {
    // ---
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u32)
        .unwrap_or(0)
}
