//! Online throughput estimators.
//!
//! Predictors observe completed downloads (`megabytes` over `seconds`) and
//! forecast the bandwidth available for the next fetch. Before the first
//! observation every predictor forecasts `0.0` Mbps, which steers
//! controllers to the lowest rung for the opening segment group.
//!
//! The concrete estimators are a small closed set; dispatch is by enum tag
//! and the options enum carries the same discriminant for the host layer.

mod ema;
mod moving_average;

pub use ema::{EmaPredictor, EmaPredictorOptions};
pub use moving_average::{MovingAveragePredictor, MovingAveragePredictorOptions};

use serde::{Deserialize, Serialize};

/// Capability set shared by all throughput predictors.
pub trait ThroughputPredictor {
    /// Records a completed download of `megabytes` MB over `seconds` s.
    ///
    /// Degenerate observations (non-positive size or duration, non-finite
    /// values) are silently ignored so one bad sample cannot poison the
    /// estimate.
    fn update(&mut self, megabytes: f64, seconds: f64);

    /// Forecast of the next download's mean throughput in Mbps.
    fn predict_throughput_mbps(&self) -> f64;
}

/// Tagged options for building a throughput predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThroughputPredictorOptions {
    Ema(EmaPredictorOptions),
    MovingAverage(MovingAveragePredictorOptions),
}

impl Default for ThroughputPredictorOptions {
    fn default() -> Self {
        ThroughputPredictorOptions::MovingAverage(MovingAveragePredictorOptions::default())
    }
}

impl ThroughputPredictorOptions {
    /// Builds the predictor variant selected by this options value.
    pub fn build(&self) -> ThroughputPredictorKind {
        match self {
            ThroughputPredictorOptions::Ema(options) => {
                ThroughputPredictorKind::Ema(EmaPredictor::new(options.clone()))
            }
            ThroughputPredictorOptions::MovingAverage(options) => {
                ThroughputPredictorKind::MovingAverage(MovingAveragePredictor::new(options.clone()))
            }
        }
    }
}

/// Runtime predictor; shares its discriminant with the options enum.
#[derive(Debug, Clone)]
pub enum ThroughputPredictorKind {
    Ema(EmaPredictor),
    MovingAverage(MovingAveragePredictor),
}

impl ThroughputPredictor for ThroughputPredictorKind {
    fn update(&mut self, megabytes: f64, seconds: f64) {
        match self {
            ThroughputPredictorKind::Ema(p) => p.update(megabytes, seconds),
            ThroughputPredictorKind::MovingAverage(p) => p.update(megabytes, seconds),
        }
    }

    fn predict_throughput_mbps(&self) -> f64 {
        match self {
            ThroughputPredictorKind::Ema(p) => p.predict_throughput_mbps(),
            ThroughputPredictorKind::MovingAverage(p) => p.predict_throughput_mbps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_tag_round_trips() {
        let options = ThroughputPredictorOptions::Ema(EmaPredictorOptions::default());
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"type\":\"Ema\""));
        let back: ThroughputPredictorOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn build_matches_discriminant() {
        let kind = ThroughputPredictorOptions::default().build();
        assert!(matches!(kind, ThroughputPredictorKind::MovingAverage(_)));
    }
}
