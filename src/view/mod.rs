//! Primary-view forecasters.
//!
//! A view predictor observes the ground-truth primary view ID once per view
//! tick and forecasts, over a horizon of future playback groups, the
//! probability that each stream is the primary view while a group plays.
//! Forecast rows always sum to 1.
//!
//! Like the throughput estimators, the variants form a small closed set
//! dispatched by enum tag, with an options enum carrying the same
//! discriminant.

mod fixed;
mod markov;

pub use fixed::{StaticPredictor, StaticPredictorOptions};
pub use markov::{MarkovPredictor, MarkovPredictorOptions};

use serde::{Deserialize, Serialize};

/// Capability set shared by all view predictors.
pub trait ViewPredictor {
    /// Extends the observation history, one ID per view tick.
    ///
    /// IDs must already be validated against the stream count.
    fn update(&mut self, primary_stream_ids: &[i64]);

    /// Row-major `[group_count x stream_count]` forecast of the primary
    /// view for groups spanning `[t0 + g*segment, t0 + (g+1)*segment)`
    /// seconds from now.
    fn predict_primary_stream_distributions(
        &self,
        t0_seconds: f64,
        group_count: usize,
        segment_seconds: f64,
    ) -> Vec<f64>;
}

/// Tagged options for building a view predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewPredictorOptions {
    Markov(MarkovPredictorOptions),
    Static(StaticPredictorOptions),
}

impl Default for ViewPredictorOptions {
    fn default() -> Self {
        ViewPredictorOptions::Static(StaticPredictorOptions::default())
    }
}

impl ViewPredictorOptions {
    /// Builds the predictor variant selected by this options value.
    ///
    /// `tick_seconds` is the observation interval of the primary-stream
    /// series the predictor will be fed with.
    pub fn build(&self, stream_count: usize, tick_seconds: f64) -> ViewPredictorKind {
        match self {
            ViewPredictorOptions::Markov(options) => ViewPredictorKind::Markov(
                MarkovPredictor::new(stream_count, tick_seconds, options.clone()),
            ),
            ViewPredictorOptions::Static(options) => {
                ViewPredictorKind::Static(StaticPredictor::new(stream_count, options.clone()))
            }
        }
    }
}

/// Runtime predictor; shares its discriminant with the options enum.
#[derive(Debug, Clone)]
pub enum ViewPredictorKind {
    Markov(MarkovPredictor),
    Static(StaticPredictor),
}

impl ViewPredictor for ViewPredictorKind {
    fn update(&mut self, primary_stream_ids: &[i64]) {
        match self {
            ViewPredictorKind::Markov(p) => p.update(primary_stream_ids),
            ViewPredictorKind::Static(p) => p.update(primary_stream_ids),
        }
    }

    fn predict_primary_stream_distributions(
        &self,
        t0_seconds: f64,
        group_count: usize,
        segment_seconds: f64,
    ) -> Vec<f64> {
        match self {
            ViewPredictorKind::Markov(p) => {
                p.predict_primary_stream_distributions(t0_seconds, group_count, segment_seconds)
            }
            ViewPredictorKind::Static(p) => {
                p.predict_primary_stream_distributions(t0_seconds, group_count, segment_seconds)
            }
        }
    }
}
