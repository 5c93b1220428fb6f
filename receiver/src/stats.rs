//! Periodic statistics reporting for the receiver.
//!
//! Every report window the reporter samples the sequence tracker and, when
//! playback is active, the render-path counters, logs a one-line summary and
//! resets the per-window figures. Cumulative totals are never reset.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::playback::{PlaybackCounters, SharedPlaybackCounters};
use crate::sequence::SequenceTracker;

/// One report's worth of figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    // ---
    /// Packets received since the previous report
    pub window_received: u64,

    pub total_received: u64,
    pub total_lost: u64,
    pub bitrate_kbps: f64,
    pub packet_rate: f64,

    /// Configured jitter depth in milliseconds
    pub buffer_ms: f64,

    /// Render-path counters for the window, when playback is active
    pub playback: Option<PlaybackCounters>,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        write!(
            f,
            "received={} (+{}) lost={} bitrate={:.1} kbps packet_rate={:.1}/s buffer={:.1} ms",
            self.total_received,
            self.window_received,
            self.total_lost,
            self.bitrate_kbps,
            self.packet_rate,
            self.buffer_ms
        )?;
        if let Some(playback) = self.playback {
            write!(
                f,
                " underflows={} max_depth={}",
                playback.underflow_count, playback.max_observed_depth
            )?;
        }
        Ok(())
    }
}

/// Timer-driven stats aggregation.
///
/// Driven from the receive loop; it has no thread of its own.
#[derive(Debug, Clone)]
pub struct StatsReporter {
    // ---
    period: Duration,
    last_report: Instant,
    buffer_ms: f64,
    playback: Option<SharedPlaybackCounters>,
    reports: u64,
}

impl StatsReporter {
    // ---
    /// Creates a reporter.
    ///
    /// # Arguments
    ///
    /// * `period` - Minimum time between reports
    /// * `buffer_ms` - Configured jitter depth, echoed in every report
    /// * `playback` - Render counters; `None` in stats-only mode
    pub fn new(
        period: Duration,
        buffer_ms: f64,
        playback: Option<SharedPlaybackCounters>,
    ) -> Self {
        // ---
        Self::starting_at(period, buffer_ms, playback, Instant::now())
    }

    pub fn starting_at(
        period: Duration,
        buffer_ms: f64,
        playback: Option<SharedPlaybackCounters>,
        start: Instant,
    ) -> Self {
        // ---
        Self {
            period,
            last_report: start,
            buffer_ms,
            playback,
            reports: 0,
        }
    }

    /// Whether a full period has elapsed since the last report.
    pub fn is_due(&self, now: Instant) -> bool {
        // ---
        now.saturating_duration_since(self.last_report) >= self.period
    }

    /// Reports if due.
    pub fn maybe_report(
        &mut self,
        now: Instant,
        tracker: &mut SequenceTracker,
    ) -> Option<StatsSummary> {
        // ---
        if self.is_due(now) {
            Some(self.report(now, tracker))
        } else {
            None
        }
    }

    /// Builds, logs and returns a summary, then starts a new window.
    pub fn report(&mut self, now: Instant, tracker: &mut SequenceTracker) -> StatsSummary {
        // ---
        let throughput = tracker.take_window(now);
        let summary = StatsSummary {
            window_received: throughput.window_received,
            total_received: throughput.total_received,
            total_lost: throughput.total_lost,
            bitrate_kbps: throughput.bitrate_bps / 1000.0,
            packet_rate: throughput.packet_rate,
            buffer_ms: self.buffer_ms,
            playback: self.playback.as_ref().map(SharedPlaybackCounters::take),
        };

        info!("Stats: {}", summary);
        self.last_report = now;
        self.reports += 1;
        summary
    }

    /// Number of reports emitted so far.
    pub fn reports_emitted(&self) -> u64 {
        // ---
        self.reports
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_not_due_before_period() {
        // ---
        let start = Instant::now();
        let reporter = StatsReporter::starting_at(Duration::from_secs(5), 60.0, None, start);

        assert!(!reporter.is_due(start + Duration::from_millis(4999)));
        assert!(reporter.is_due(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_report_resets_window_only() {
        // ---
        let start = Instant::now();
        let mut tracker = SequenceTracker::starting_at(start);
        let mut reporter = StatsReporter::starting_at(Duration::from_secs(5), 60.0, None, start);

        tracker.update(0, 1764);
        tracker.update(3, 1764);

        assert!(reporter
            .maybe_report(start + Duration::from_secs(1), &mut tracker)
            .is_none());

        let first = reporter
            .maybe_report(start + Duration::from_secs(5), &mut tracker)
            .expect("report due");
        assert_eq!(first.window_received, 2);
        assert_eq!(first.total_received, 2);
        assert_eq!(first.total_lost, 2);
        assert!(first.playback.is_none());

        tracker.update(4, 1764);
        let second = reporter.report(start + Duration::from_secs(10), &mut tracker);
        assert_eq!(reporter.reports_emitted(), 2);
        assert_eq!(second.window_received, 1);
        assert_eq!(second.total_received, 3);
        assert_eq!(second.total_lost, 2);
    }

    #[test]
    fn test_playback_counters_reset_each_report() {
        // ---
        let start = Instant::now();
        let counters = SharedPlaybackCounters::new();
        let mut tracker = SequenceTracker::starting_at(start);
        let mut reporter = StatsReporter::starting_at(
            Duration::from_secs(5),
            60.0,
            Some(counters.clone()),
            start,
        );

        counters.record(7, true);
        counters.record(3, true);

        let summary = reporter.report(start + Duration::from_secs(5), &mut tracker);
        assert_eq!(
            summary.playback,
            Some(PlaybackCounters {
                underflow_count: 2,
                max_observed_depth: 7
            })
        );

        let next = reporter.report(start + Duration::from_secs(10), &mut tracker);
        assert_eq!(next.playback, Some(PlaybackCounters::default()));
    }

    #[test]
    fn test_summary_line() {
        // ---
        let summary = StatsSummary {
            window_received: 250,
            total_received: 1000,
            total_lost: 4,
            bitrate_kbps: 705.6,
            packet_rate: 50.0,
            buffer_ms: 60.0,
            playback: Some(PlaybackCounters {
                underflow_count: 1,
                max_observed_depth: 12,
            }),
        };

        assert_eq!(
            summary.to_string(),
            "received=1000 (+250) lost=4 bitrate=705.6 kbps packet_rate=50.0/s buffer=60.0 ms \
             underflows=1 max_depth=12"
        );
    }
}
