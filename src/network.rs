//! Simulated network clock.
//!
//! [`NetworkSimulator`] advances a monotonic clock against an immutable
//! throughput series and answers download-cost queries. Integration is
//! exact across tick boundaries: within one tick the rate is constant, so
//! elapsed time for a byte budget is `size / rate`; across ticks the
//! simulator consumes the remaining capacity of the current tick and moves
//! on. When the clock runs past the end of the series the series repeats
//! from the start.

use crate::series::NetworkSeriesView;

/// Result of a (possibly capped) transfer: elapsed wall time and volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedValue {
    pub seconds: f64,
    pub megabytes: f64,
}

/// Advances simulated time against a throughput series.
///
/// Owns only the clock; the series is borrowed for the session's lifetime.
#[derive(Debug)]
pub struct NetworkSimulator<'a> {
    series: NetworkSeriesView<'a>,
    clock_seconds: f64,
}

impl<'a> NetworkSimulator<'a> {
    /// The series must already be validated (positive tick and samples).
    pub fn new(series: NetworkSeriesView<'a>) -> Self {
        NetworkSimulator {
            series,
            clock_seconds: 0.0,
        }
    }

    /// Current simulated time in seconds.
    pub fn clock_seconds(&self) -> f64 {
        self.clock_seconds
    }

    /// Transfers `size_mb` megabytes in full, returning the elapsed time.
    pub fn download(&mut self, size_mb: f64) -> TimedValue {
        self.transfer(size_mb, f64::INFINITY)
    }

    /// Transfers for at most `max_seconds`, returning the actual elapsed
    /// time and megabytes moved.
    pub fn download_for(&mut self, size_mb: f64, max_seconds: f64) -> TimedValue {
        assert!(
            max_seconds >= 0.0,
            "negative transfer deadline: {max_seconds}"
        );
        self.transfer(size_mb, max_seconds)
    }

    /// Advances the clock by `seconds` without transferring.
    pub fn wait_for(&mut self, seconds: f64) {
        assert!(seconds >= 0.0, "negative wait duration: {seconds}");
        self.clock_seconds += seconds;
    }

    fn transfer(&mut self, size_mb: f64, max_seconds: f64) -> TimedValue {
        assert!(
            size_mb >= 0.0 && !size_mb.is_nan(),
            "negative transfer size: {size_mb} MB"
        );
        let start = self.clock_seconds;
        let deadline = start + max_seconds;
        let mut remaining_mb = size_mb;
        while remaining_mb > 0.0 && self.clock_seconds < deadline {
            let tick = self.series.tick_seconds;
            let tick_index = (self.clock_seconds / tick).floor();
            let rate_mb_per_s = self.sample_mbps(tick_index) / 8.0;
            let slice_end = ((tick_index + 1.0) * tick).min(deadline);
            let capacity_mb = rate_mb_per_s * (slice_end - self.clock_seconds);
            if capacity_mb >= remaining_mb {
                self.clock_seconds += remaining_mb / rate_mb_per_s;
                remaining_mb = 0.0;
            } else {
                remaining_mb -= capacity_mb;
                self.clock_seconds = slice_end;
            }
        }
        TimedValue {
            seconds: self.clock_seconds - start,
            megabytes: size_mb - remaining_mb,
        }
    }

    fn sample_mbps(&self, tick_index: f64) -> f64 {
        let len = self.series.throughputs_mbps.len();
        self.series.throughputs_mbps[tick_index as usize % len]
    }
}
