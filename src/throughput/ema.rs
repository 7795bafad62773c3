//! Dual-half-life exponential throughput estimator.

use serde::{Deserialize, Serialize};

use super::ThroughputPredictor;

/// Options for [`EmaPredictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaPredictorOptions {
    /// Half-life of the fast estimate in seconds of download time.
    pub fast_half_life_seconds: f64,
    /// Half-life of the slow estimate in seconds of download time.
    pub slow_half_life_seconds: f64,
}

impl Default for EmaPredictorOptions {
    fn default() -> Self {
        EmaPredictorOptions {
            fast_half_life_seconds: 2.0,
            slow_half_life_seconds: 32.0,
        }
    }
}

/// One exponentially-weighted mean of inverse rate with bias correction.
///
/// `residual_weight` is the product of `(1 - alpha)` over all observations;
/// dividing the raw mean by `1 - residual_weight` removes the zero-init
/// bias while few samples have been seen.
#[derive(Debug, Clone)]
struct DecayingMean {
    half_life_seconds: f64,
    seconds_per_mbit: f64,
    residual_weight: f64,
}

impl DecayingMean {
    fn new(half_life_seconds: f64) -> Self {
        DecayingMean {
            half_life_seconds,
            seconds_per_mbit: 0.0,
            residual_weight: 1.0,
        }
    }

    fn observe(&mut self, seconds_per_mbit: f64, duration_seconds: f64) {
        let alpha = 1.0 - (-duration_seconds * std::f64::consts::LN_2 / self.half_life_seconds).exp();
        self.seconds_per_mbit = alpha * seconds_per_mbit + (1.0 - alpha) * self.seconds_per_mbit;
        self.residual_weight *= 1.0 - alpha;
    }

    fn corrected(&self) -> f64 {
        self.seconds_per_mbit / (1.0 - self.residual_weight)
    }
}

/// Fast/slow exponential estimator over inverse rate.
///
/// Each observed download contributes its inverse rate (seconds per
/// megabit), decayed in observed duration, to two means with different
/// half-lives. The forecast takes whichever bias-corrected mean implies the
/// higher rate: the fast mean answers quickly after an upswing while the
/// slow mean carries the session baseline through short dips.
#[derive(Debug, Clone)]
pub struct EmaPredictor {
    fast: DecayingMean,
    slow: DecayingMean,
    observed: bool,
}

impl EmaPredictor {
    pub fn new(options: EmaPredictorOptions) -> Self {
        assert!(
            options.fast_half_life_seconds > 0.0 && options.slow_half_life_seconds > 0.0,
            "half-lives must be positive: fast {} s, slow {} s",
            options.fast_half_life_seconds,
            options.slow_half_life_seconds
        );
        EmaPredictor {
            fast: DecayingMean::new(options.fast_half_life_seconds),
            slow: DecayingMean::new(options.slow_half_life_seconds),
            observed: false,
        }
    }
}

impl ThroughputPredictor for EmaPredictor {
    fn update(&mut self, megabytes: f64, seconds: f64) {
        if !(megabytes > 0.0) || !(seconds > 0.0) || !megabytes.is_finite() || !seconds.is_finite()
        {
            return;
        }
        let seconds_per_mbit = seconds / (8.0 * megabytes);
        self.fast.observe(seconds_per_mbit, seconds);
        self.slow.observe(seconds_per_mbit, seconds);
        self.observed = true;
    }

    fn predict_throughput_mbps(&self) -> f64 {
        if !self.observed {
            return 0.0;
        }
        1.0 / self.fast.corrected().min(self.slow.corrected())
    }
}
