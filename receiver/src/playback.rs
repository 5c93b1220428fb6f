//! Real-time playback feeding.
//!
//! [`PlaybackFeeder`] sits inside the audio sink's render callback. Each
//! call must hand back exactly the requested number of bytes in bounded
//! time: it drains whatever the jitter buffer has, pads any shortfall with
//! silence, and counts the callback as one underflow.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::jitter_buffer::JitterBuffer;

/// Render-path counters for one report window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackCounters {
    // ---
    /// Callbacks that had to be padded with silence
    pub underflow_count: u32,

    /// Deepest queue seen at the start of a callback
    pub max_observed_depth: u32,
}

/// Playback counters shared between the render callback and the reporter.
///
/// Guarded by their own short lock, separate from the jitter queue. Each
/// critical section is a couple of integer updates.
#[derive(Debug, Clone, Default)]
pub struct SharedPlaybackCounters {
    // ---
    inner: Arc<Mutex<PlaybackCounters>>,
}

impl SharedPlaybackCounters {
    // ---
    pub fn new() -> Self {
        // ---
        Self::default()
    }

    /// Records one callback: the queue depth it saw and whether it underflowed.
    pub fn record(&self, depth: usize, underflowed: bool) {
        // ---
        let depth = u32::try_from(depth).unwrap_or(u32::MAX);
        let mut counters = self.inner.lock();
        if depth > counters.max_observed_depth {
            counters.max_observed_depth = depth;
        }
        if underflowed {
            counters.underflow_count = counters.underflow_count.saturating_add(1);
        }
    }

    /// Current values without resetting.
    pub fn peek(&self) -> PlaybackCounters {
        // ---
        *self.inner.lock()
    }

    /// Returns the window's counters and resets them to zero.
    pub fn take(&self) -> PlaybackCounters {
        // ---
        std::mem::take(&mut *self.inner.lock())
    }
}

/// Pull-side adapter from the jitter buffer to fixed-size render requests.
///
/// Owns the pending-byte accumulator; chunk boundaries never line up with
/// callback sizes, so leftover bytes carry over to the next call.
pub struct PlaybackFeeder {
    // ---
    buffer: JitterBuffer,
    pending: Vec<u8>,
    counters: SharedPlaybackCounters,
}

impl PlaybackFeeder {
    // ---
    pub fn new(buffer: JitterBuffer, counters: SharedPlaybackCounters) -> Self {
        // ---
        Self {
            buffer,
            pending: Vec::with_capacity(64 * 1024),
            counters,
        }
    }

    /// Fills `out` completely.
    ///
    /// Pulls chunks without waiting until enough bytes are pending. If the
    /// queue runs dry first, the remainder is zero-filled and the call
    /// counts as a single underflow, however large the gap.
    pub fn fill(&mut self, out: &mut [u8]) {
        // ---
        let needed = out.len();
        let depth = self.buffer.depth();
        let mut underflowed = false;

        while self.pending.len() < needed {
            match self.buffer.pull_nonblocking() {
                Some(chunk) => self.pending.extend_from_slice(&chunk),
                None => {
                    self.pending.resize(needed, 0);
                    underflowed = true;
                    break;
                }
            }
        }

        out.copy_from_slice(&self.pending[..needed]);
        self.pending.drain(..needed);

        self.counters.record(depth, underflowed);
    }

    /// Allocating convenience over [`fill`](Self::fill).
    pub fn pull(&mut self, needed_bytes: usize) -> Vec<u8> {
        // ---
        let mut out = vec![0u8; needed_bytes];
        self.fill(&mut out);
        out
    }

    /// Bytes carried over from the last call.
    pub fn pending_len(&self) -> usize {
        // ---
        self.pending.len()
    }

    pub fn counters(&self) -> &SharedPlaybackCounters {
        // ---
        &self.counters
    }
}
