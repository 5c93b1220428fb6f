//! Bounded jitter buffer between the receive loop and the render callback.
//!
//! A fixed-capacity FIFO of PCM chunks. The receive loop is the only
//! producer and may wait briefly for space; the render callback is the only
//! consumer and never waits. Packets are queued in arrival order: there is
//! no reordering and no adaptive sizing.
//!
//! Backed by a bounded `crossbeam-channel`, whose non-blocking receive does
//! not take a lock, so the render path cannot be stalled by the producer.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, SendTimeoutError, TrySendError};
use tracing::{debug, warn};

use crate::config::{PUSH_TIMEOUT, QUEUE_CAPACITY};

/// Jitter buffer configuration.
#[derive(Debug, Clone)]
pub struct JitterBufferConfig {
    // ---
    /// Maximum number of queued chunks
    pub max_chunks: usize,

    /// Longest time `push` waits for a free slot
    pub push_timeout: Duration,
}

impl Default for JitterBufferConfig {
    fn default() -> Self {
        // ---
        Self {
            max_chunks: QUEUE_CAPACITY,
            push_timeout: PUSH_TIMEOUT,
        }
    }
}

/// Result of offering a chunk to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,

    /// No slot freed up within the push timeout; the chunk was discarded.
    Dropped,
}

/// Bounded FIFO of audio payload chunks.
///
/// Clones share the same queue, so the receive loop and the playback
/// feeder each hold their own handle.
#[derive(Debug, Clone)]
pub struct JitterBuffer {
    // ---
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    push_timeout: Duration,
}

impl JitterBuffer {
    // ---
    pub fn new(config: JitterBufferConfig) -> Self {
        // ---
        let (tx, rx) = bounded(config.max_chunks.max(1));
        Self {
            tx,
            rx,
            push_timeout: config.push_timeout,
        }
    }

    /// Queues a chunk, waiting at most the push timeout for space.
    ///
    /// Producer side only. On timeout the chunk is dropped and the caller
    /// is told so it can log the backpressure.
    pub fn push(&self, chunk: Vec<u8>) -> PushOutcome {
        // ---
        match self.tx.send_timeout(chunk, self.push_timeout) {
            Ok(()) => PushOutcome::Queued,
            Err(SendTimeoutError::Timeout(_)) | Err(SendTimeoutError::Disconnected(_)) => {
                PushOutcome::Dropped
            }
        }
    }

    /// Queues a chunk only if space is available right now.
    ///
    /// Hands the chunk back when the queue is full so the caller can fall
    /// back to [`push`](Self::push).
    pub fn try_push(&self, chunk: Vec<u8>) -> Result<(), Vec<u8>> {
        // ---
        match self.tx.try_send(chunk) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(chunk)) | Err(TrySendError::Disconnected(chunk)) => {
                Err(chunk)
            }
        }
    }

    /// Queues `target_bytes` of silence in chunks of `silence_chunk_bytes`.
    ///
    /// Called before playback starts so the first render callbacks are
    /// served from buffered silence. The final chunk may be shorter. Never
    /// blocks: if the queue fills first, prefill stops there.
    ///
    /// Returns the number of bytes actually queued.
    pub fn prefill(&self, target_bytes: usize, silence_chunk_bytes: usize) -> usize {
        // ---
        if silence_chunk_bytes == 0 {
            return 0;
        }

        let mut queued = 0;
        while queued < target_bytes {
            let len = silence_chunk_bytes.min(target_bytes - queued);
            match self.tx.try_send(vec![0u8; len]) {
                Ok(()) => queued += len,
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                    warn!(
                        "Jitter queue full after {} of {} prefill bytes",
                        queued, target_bytes
                    );
                    break;
                }
            }
        }

        debug!("Prefilled {} bytes of silence", queued);
        queued
    }

    /// Removes the next chunk if one is ready. Never waits.
    ///
    /// This is the only operation the render path calls.
    pub fn pull_nonblocking(&self) -> Option<Vec<u8>> {
        // ---
        self.rx.try_recv().ok()
    }

    /// Number of chunks currently queued.
    pub fn depth(&self) -> usize {
        // ---
        self.rx.len()
    }

    pub fn capacity(&self) -> usize {
        // ---
        self.tx.capacity().unwrap_or(0)
    }
}

impl Default for JitterBuffer {
    fn default() -> Self {
        // ---
        Self::new(JitterBufferConfig::default())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::time::Instant;

    fn small(max_chunks: usize) -> JitterBuffer {
        JitterBuffer::new(JitterBufferConfig {
            max_chunks,
            push_timeout: Duration::from_millis(20),
        })
    }

    #[test]
    fn test_fifo_order() {
        // ---
        let buffer = small(8);

        buffer.push(vec![1]);
        buffer.push(vec![2]);
        buffer.push(vec![3]);

        assert_eq!(buffer.pull_nonblocking(), Some(vec![1]));
        assert_eq!(buffer.pull_nonblocking(), Some(vec![2]));
        assert_eq!(buffer.pull_nonblocking(), Some(vec![3]));
        assert_eq!(buffer.pull_nonblocking(), None);
    }

    #[test]
    fn test_prefill_exact_silence() {
        // ---
        let buffer = JitterBuffer::default();

        // 60 ms at 44.1 kHz mono, 256-frame chunks
        let queued = buffer.prefill(5292, 512);
        assert_eq!(queued, 5292);
        assert_eq!(buffer.depth(), 11);

        let mut total = 0;
        let mut sizes = Vec::new();
        while let Some(chunk) = buffer.pull_nonblocking() {
            assert!(chunk.iter().all(|&b| b == 0));
            total += chunk.len();
            sizes.push(chunk.len());
        }

        assert_eq!(total, 5292);
        assert!(sizes[..10].iter().all(|&s| s == 512));
        assert_eq!(sizes[10], 172);
    }

    #[test]
    fn test_prefill_stops_at_capacity() {
        // ---
        let buffer = small(4);

        let queued = buffer.prefill(10_000, 100);
        assert_eq!(queued, 400);
        assert_eq!(buffer.depth(), 4);
    }

    #[test]
    fn test_push_drops_after_timeout_when_full() {
        // ---
        let buffer = small(2);
        assert_eq!(buffer.push(vec![1]), PushOutcome::Queued);
        assert_eq!(buffer.push(vec![2]), PushOutcome::Queued);

        let start = Instant::now();
        assert_eq!(buffer.push(vec![3]), PushOutcome::Dropped);
        let waited = start.elapsed();

        assert!(waited >= Duration::from_millis(15));
        assert!(waited < Duration::from_secs(1));
        assert_eq!(buffer.depth(), 2);
    }

    #[test]
    fn test_try_push_returns_chunk_when_full() {
        // ---
        let buffer = small(1);

        assert_eq!(buffer.try_push(vec![1]), Ok(()));
        assert_eq!(buffer.try_push(vec![2]), Err(vec![2]));
        assert_eq!(buffer.depth(), 1);
    }

    #[test]
    fn test_push_succeeds_when_consumer_frees_slot() {
        // ---
        let buffer = JitterBuffer::new(JitterBufferConfig {
            max_chunks: 1,
            push_timeout: Duration::from_millis(500),
        });
        buffer.push(vec![1]);

        let consumer = buffer.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            consumer.pull_nonblocking()
        });

        assert_eq!(buffer.push(vec![2]), PushOutcome::Queued);
        assert_eq!(handle.join().unwrap(), Some(vec![1]));
        assert_eq!(buffer.pull_nonblocking(), Some(vec![2]));
    }

    #[test]
    fn test_pull_on_empty_does_not_wait() {
        // ---
        let buffer = JitterBuffer::default();

        let start = Instant::now();
        assert!(buffer.pull_nonblocking().is_none());
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(buffer.capacity(), QUEUE_CAPACITY);
    }
}
