//! Borrowed views over the input time series.
//!
//! Both series kinds are piecewise-constant: sample `i` holds on
//! `[i * tick_seconds, (i + 1) * tick_seconds)`. The views borrow
//! caller-owned slices; nothing here allocates or copies sample data.

use crate::error::DataError;

/// One network throughput series: piecewise-constant Mbps samples.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSeriesView<'a> {
    /// Width of one constant-throughput interval in seconds.
    pub tick_seconds: f64,
    /// Throughput samples in Mbps.
    pub throughputs_mbps: &'a [f64],
}

impl<'a> NetworkSeriesView<'a> {
    /// Rejects empty series, non-positive ticks, and non-positive samples.
    pub fn validate(&self) -> Result<(), DataError> {
        if !(self.tick_seconds > 0.0) {
            return Err(DataError::NonPositiveTick(self.tick_seconds));
        }
        if self.throughputs_mbps.is_empty() {
            return Err(DataError::EmptySeries);
        }
        for (index, &value) in self.throughputs_mbps.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(DataError::NonPositiveThroughput { index, value });
            }
        }
        Ok(())
    }

    /// Total time covered by the samples in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.throughputs_mbps.len() as f64 * self.tick_seconds
    }
}

/// A batch of network series, one per session.
#[derive(Debug, Clone, Default)]
pub struct NetworkDataView<'a> {
    pub series: Vec<NetworkSeriesView<'a>>,
}

impl<'a> NetworkDataView<'a> {
    pub fn session_count(&self) -> usize {
        self.series.len()
    }
}

/// One ground-truth primary-view series: view IDs sampled per tick.
#[derive(Debug, Clone, Copy)]
pub struct PrimaryStreamSeriesView<'a> {
    /// Width of one observation interval in seconds.
    pub tick_seconds: f64,
    /// Primary view ID per tick, each in `[0, stream_count)`.
    pub primary_stream_ids: &'a [i64],
}

impl<'a> PrimaryStreamSeriesView<'a> {
    /// Rejects empty series, non-positive ticks, and out-of-range IDs.
    pub fn validate(&self, stream_count: usize) -> Result<(), DataError> {
        if !(self.tick_seconds > 0.0) {
            return Err(DataError::NonPositiveTick(self.tick_seconds));
        }
        if self.primary_stream_ids.is_empty() {
            return Err(DataError::EmptySeries);
        }
        for (index, &id) in self.primary_stream_ids.iter().enumerate() {
            if id < 0 || id as usize >= stream_count {
                return Err(DataError::StreamIdOutOfRange {
                    index,
                    id,
                    stream_count,
                });
            }
        }
        Ok(())
    }

    /// Total time covered by the observations in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.primary_stream_ids.len() as f64 * self.tick_seconds
    }
}

/// A batch of primary-view series; its length defines the session count.
#[derive(Debug, Clone, Default)]
pub struct PrimaryStreamDataView<'a> {
    pub series: Vec<PrimaryStreamSeriesView<'a>>,
}

impl<'a> PrimaryStreamDataView<'a> {
    pub fn session_count(&self) -> usize {
        self.series.len()
    }
}
