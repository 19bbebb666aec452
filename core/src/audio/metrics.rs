//! Feeder health monitoring and diagnostics

use std::time::{Duration, Instant};

use tracing::debug;

/// Interval between metric log lines
const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Running statistics for the sound feeder
///
/// Counters accumulate for the life of the stream; the latency window resets
/// each time a line is logged.
#[derive(Debug, Clone)]
pub struct FeederMetrics {
    /// Feed cycles run
    pub cycles: u64,
    /// Bytes written into the ring
    pub bytes_written: u64,
    /// Cycles where playback had lapped the producer
    pub resyncs: u64,
    /// Cycles skipped because the device could not be queried
    pub skipped_cycles: u64,
    /// Calls where the game layer filled fewer frames than requested
    pub partial_fills: u64,
    /// Smallest queued audio seen (bytes ahead of playback)
    pub latency_min: usize,
    /// Largest queued audio seen (bytes ahead of playback)
    pub latency_max: usize,
    /// Timestamp of last metrics log
    last_log_time: Instant,
}

impl FeederMetrics {
    pub fn new() -> Self {
        Self {
            cycles: 0,
            bytes_written: 0,
            resyncs: 0,
            skipped_cycles: 0,
            partial_fills: 0,
            latency_min: usize::MAX,
            latency_max: 0,
            last_log_time: Instant::now(),
        }
    }

    /// Track queued bytes between the play cursor and the write position
    pub fn record_latency(&mut self, queued: usize) {
        self.latency_min = self.latency_min.min(queued);
        self.latency_max = self.latency_max.max(queued);
    }

    /// Log metrics if enough time has passed, then start a new latency window
    pub fn maybe_log(&mut self, bytes_per_second: usize) {
        if self.last_log_time.elapsed() < LOG_INTERVAL {
            return;
        }

        let to_ms = |bytes: usize| bytes as f64 * 1000.0 / bytes_per_second.max(1) as f64;
        let latency_min = if self.latency_min == usize::MAX {
            0
        } else {
            self.latency_min
        };

        debug!(
            "AUDIO FEEDER: cycles={}, written={}B, latency={:.1}-{:.1}ms, resyncs={}, \
             skipped={}, partial_fills={}",
            self.cycles,
            self.bytes_written,
            to_ms(latency_min),
            to_ms(self.latency_max),
            self.resyncs,
            self.skipped_cycles,
            self.partial_fills
        );

        self.latency_min = usize::MAX;
        self.latency_max = 0;
        self.last_log_time = Instant::now();
    }
}

impl Default for FeederMetrics {
    fn default() -> Self {
        Self::new()
    }
}
