//! Constant-forecast view predictor.

use serde::{Deserialize, Serialize};

use super::ViewPredictor;

/// Options for [`StaticPredictor`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticPredictorOptions {
    /// Fixed per-stream distribution. `None` means one-hot on stream 0.
    pub distribution: Option<Vec<f64>>,
}

/// Forecasts the same distribution for every group, ignoring observations.
///
/// Useful as the no-information baseline and for pinning controller
/// behaviour in tests.
#[derive(Debug, Clone)]
pub struct StaticPredictor {
    distribution: Vec<f64>,
}

impl StaticPredictor {
    pub fn new(stream_count: usize, options: StaticPredictorOptions) -> Self {
        let distribution = match options.distribution {
            Some(weights) => {
                assert_eq!(
                    weights.len(),
                    stream_count,
                    "fixed distribution length must equal the stream count"
                );
                let total: f64 = weights.iter().sum();
                assert!(
                    total > 0.0 && weights.iter().all(|w| *w >= 0.0),
                    "fixed distribution must be non-negative with positive mass"
                );
                weights.iter().map(|w| w / total).collect()
            }
            None => {
                let mut one_hot = vec![0.0; stream_count];
                one_hot[0] = 1.0;
                one_hot
            }
        };
        StaticPredictor { distribution }
    }
}

impl ViewPredictor for StaticPredictor {
    fn update(&mut self, _primary_stream_ids: &[i64]) {}

    fn predict_primary_stream_distributions(
        &self,
        _t0_seconds: f64,
        group_count: usize,
        _segment_seconds: f64,
    ) -> Vec<f64> {
        let mut out = Vec::with_capacity(group_count * self.distribution.len());
        for _ in 0..group_count {
            out.extend_from_slice(&self.distribution);
        }
        out
    }
}
