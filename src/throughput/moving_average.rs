//! Windowed moving-average throughput estimator.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::ThroughputPredictor;

/// Options for [`MovingAveragePredictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAveragePredictorOptions {
    /// Observation window in seconds of download time.
    pub window_seconds: f64,
}

impl Default for MovingAveragePredictorOptions {
    fn default() -> Self {
        MovingAveragePredictorOptions {
            window_seconds: 4.0,
        }
    }
}

/// Duration-windowed mean rate.
///
/// Keeps the most recent samples whose durations just cover the window (the
/// minimal suffix with total duration at or above `window_seconds`) and
/// predicts total megabits over total seconds, i.e. the duration-weighted
/// harmonic mean of the observed rates.
#[derive(Debug, Clone)]
pub struct MovingAveragePredictor {
    window_seconds: f64,
    /// Recent samples: (megabytes, seconds).
    samples: VecDeque<(f64, f64)>,
    total_mb: f64,
    total_seconds: f64,
}

impl MovingAveragePredictor {
    pub fn new(options: MovingAveragePredictorOptions) -> Self {
        assert!(
            options.window_seconds > 0.0,
            "window must be positive: {} s",
            options.window_seconds
        );
        MovingAveragePredictor {
            window_seconds: options.window_seconds,
            samples: VecDeque::with_capacity(16),
            total_mb: 0.0,
            total_seconds: 0.0,
        }
    }
}

impl ThroughputPredictor for MovingAveragePredictor {
    fn update(&mut self, megabytes: f64, seconds: f64) {
        if !(megabytes > 0.0) || !(seconds > 0.0) || !megabytes.is_finite() || !seconds.is_finite()
        {
            return;
        }
        self.samples.push_back((megabytes, seconds));
        self.total_mb += megabytes;
        self.total_seconds += seconds;
        // Drop old samples while the remainder still covers the window.
        while let Some(&(front_mb, front_seconds)) = self.samples.front() {
            if self.total_seconds - front_seconds < self.window_seconds {
                break;
            }
            self.samples.pop_front();
            self.total_mb -= front_mb;
            self.total_seconds -= front_seconds;
        }
    }

    fn predict_throughput_mbps(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        8.0 * self.total_mb / self.total_seconds
    }
}
