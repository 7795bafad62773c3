//! First-order Markov view predictor.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::ViewPredictor;

/// Options for [`MarkovPredictor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkovPredictorOptions {
    /// Observation window used to estimate transitions, in seconds.
    pub window_seconds: f64,
    /// Laplace smoothing constant; unobserved transitions keep this mass.
    pub smoothing: f64,
}

impl Default for MarkovPredictorOptions {
    fn default() -> Self {
        MarkovPredictorOptions {
            window_seconds: 10.0,
            smoothing: 0.1,
        }
    }
}

/// Windowed first-order Markov chain over the primary view ID.
///
/// Keeps a ring buffer of the last `ceil(window / tick)` observed IDs and
/// estimates a smoothed transition matrix from the consecutive pairs in the
/// window:
///
/// `P[i][j] = (C[i][j] + lambda) / (sum_k C[i][k] + lambda * S)`
///
/// The forecast starts from a one-hot on the most recent ID (uniform when
/// nothing has been observed), advances one matrix step per view tick, and
/// reports each group's overlap-weighted average of the stepped
/// distribution across the ticks its playback span intersects.
#[derive(Debug, Clone)]
pub struct MarkovPredictor {
    stream_count: usize,
    tick_seconds: f64,
    smoothing: f64,
    capacity: usize,
    history: VecDeque<i64>,
}

impl MarkovPredictor {
    pub fn new(stream_count: usize, tick_seconds: f64, options: MarkovPredictorOptions) -> Self {
        assert!(stream_count >= 1, "stream count must be at least 1");
        assert!(
            tick_seconds > 0.0,
            "view tick must be positive: {tick_seconds} s"
        );
        assert!(
            options.window_seconds > 0.0 && options.smoothing >= 0.0,
            "window must be positive and smoothing non-negative"
        );
        let capacity = (options.window_seconds / tick_seconds).ceil().max(1.0) as usize;
        MarkovPredictor {
            stream_count,
            tick_seconds,
            smoothing: options.smoothing,
            capacity,
            history: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Smoothed row-major transition matrix from the windowed pair counts.
    fn transition_matrix(&self) -> Vec<f64> {
        let s = self.stream_count;
        let mut counts = vec![0.0; s * s];
        let mut previous: Option<i64> = None;
        for &id in &self.history {
            if let Some(from) = previous {
                counts[from as usize * s + id as usize] += 1.0;
            }
            previous = Some(id);
        }
        let mut matrix = vec![0.0; s * s];
        for i in 0..s {
            let row_total: f64 = counts[i * s..(i + 1) * s].iter().sum();
            let denominator = row_total + self.smoothing * s as f64;
            for j in 0..s {
                matrix[i * s + j] = if denominator > 0.0 {
                    (counts[i * s + j] + self.smoothing) / denominator
                } else {
                    // lambda == 0 and an unobserved row: no information.
                    1.0 / s as f64
                };
            }
        }
        matrix
    }

    fn step(&self, matrix: &[f64], pi: &[f64]) -> Vec<f64> {
        let s = self.stream_count;
        let mut next = vec![0.0; s];
        for i in 0..s {
            let mass = pi[i];
            if mass == 0.0 {
                continue;
            }
            for j in 0..s {
                next[j] += mass * matrix[i * s + j];
            }
        }
        next
    }
}

impl ViewPredictor for MarkovPredictor {
    fn update(&mut self, primary_stream_ids: &[i64]) {
        for &id in primary_stream_ids {
            debug_assert!(
                id >= 0 && (id as usize) < self.stream_count,
                "view ID {id} outside [0, {})",
                self.stream_count
            );
            self.history.push_back(id);
            if self.history.len() > self.capacity {
                self.history.pop_front();
            }
        }
    }

    fn predict_primary_stream_distributions(
        &self,
        t0_seconds: f64,
        group_count: usize,
        segment_seconds: f64,
    ) -> Vec<f64> {
        assert!(
            t0_seconds >= 0.0 && segment_seconds > 0.0,
            "forecast span must be non-negative and segments positive"
        );
        let s = self.stream_count;
        let mut out = vec![0.0; group_count * s];
        if group_count == 0 {
            return out;
        }

        let matrix = self.transition_matrix();
        let mut pi = match self.history.back() {
            Some(&last) => {
                let mut one_hot = vec![0.0; s];
                one_hot[last as usize] = 1.0;
                one_hot
            }
            None => vec![1.0 / s as f64; s],
        };
        // `pi` always corresponds to tick `tick_index` on a grid anchored
        // at the present (tick k spans [k*tick, (k+1)*tick) from now).
        let mut tick_index = 0usize;

        let tick = self.tick_seconds;
        for g in 0..group_count {
            let start = t0_seconds + g as f64 * segment_seconds;
            let end = start + segment_seconds;
            let row = &mut out[g * s..(g + 1) * s];
            let mut covered = 0.0;
            let mut k = (start / tick).floor() as usize;
            while (k as f64) * tick < end {
                while tick_index < k {
                    pi = self.step(&matrix, &pi);
                    tick_index += 1;
                }
                let tick_start = k as f64 * tick;
                let overlap = end.min(tick_start + tick) - start.max(tick_start);
                if overlap > 0.0 {
                    for j in 0..s {
                        row[j] += pi[j] * overlap;
                    }
                    covered += overlap;
                }
                k += 1;
            }
            for value in row.iter_mut() {
                *value /= covered;
            }
        }
        out
    }
}
