//! Finite-horizon model-predictive controller.

use serde::{Deserialize, Serialize};

use super::{ControlAction, ControllerContext, MultiviewAbrController};
use crate::config::StreamingConfig;
use crate::view::ViewPredictor as _;

/// Options for [`ModelPredictiveController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPredictiveControllerOptions {
    /// Score penalty per second of predicted rebuffering, in Mbps units.
    pub buffer_cost_weight: f64,
    /// Whether to plan waits and in-place upgrades of the head group.
    pub upgrade_aware: bool,
    /// Number of future playback groups simulated per candidate.
    pub horizon_groups: usize,
}

impl Default for ModelPredictiveControllerOptions {
    fn default() -> Self {
        ModelPredictiveControllerOptions {
            buffer_cost_weight: 25.0,
            upgrade_aware: true,
            horizon_groups: 8,
        }
    }
}

/// One scored plan: either append a fresh group after playing out `wait`
/// buffered groups, or (sentinel `wait == buffered`) upgrade the head.
struct Candidate {
    wait_group_count: usize,
    bitrate_ids: Vec<usize>,
    score: f64,
}

/// Finite-horizon planner.
///
/// Every invocation enumerates candidate actions, rolls each one forward
/// over the next `horizon_groups` playback groups at the safety-discounted
/// throughput estimate, and scores
///
/// `sum_g E[bitrate_played(g)] - buffer_cost_weight * rebuffering(g)`
///
/// with the expectation taken under the view predictor's per-group primary
/// distribution. Appended groups repeat the candidate vector for the rest
/// of the horizon; after an upgrade the rollout continues with the
/// rate-matched vector. Ties prefer a lower wait count, then the
/// lexicographically smaller bitrate vector.
#[derive(Debug, Clone)]
pub struct ModelPredictiveController {
    config: StreamingConfig,
    options: ModelPredictiveControllerOptions,
}

impl ModelPredictiveController {
    pub fn new(config: StreamingConfig, options: ModelPredictiveControllerOptions) -> Self {
        assert!(
            options.buffer_cost_weight >= 0.0,
            "buffer cost weight must be non-negative"
        );
        ModelPredictiveController { config, options }
    }

    /// All bitrate vectors in lexicographic order, paired with their group
    /// download volume in MB.
    fn candidate_vectors(&self) -> Vec<(Vec<usize>, f64)> {
        let streams = self.config.stream_count;
        let rungs = self.config.bitrate_count();
        let mut vectors = Vec::new();
        let mut current = vec![0usize; streams];
        loop {
            let size_mb: f64 = current.iter().map(|&r| self.config.segment_mb(r)).sum();
            vectors.push((current.clone(), size_mb));
            // Odometer increment from the last stream.
            let mut position = streams;
            loop {
                if position == 0 {
                    return vectors;
                }
                position -= 1;
                current[position] += 1;
                if current[position] < rungs {
                    break;
                }
                current[position] = 0;
            }
        }
    }

    /// Simulates `downloads` sequential fetches of `fetch_seconds` each
    /// against the buffer model, returning accumulated rebuffering.
    fn rollout_rebuffering(&self, mut buffer_seconds: f64, fetch_seconds: f64, downloads: usize) -> f64 {
        let segment = self.config.segment_seconds;
        let mut rebuffering = 0.0;
        for _ in 0..downloads {
            if buffer_seconds + segment > self.config.max_buffer_seconds {
                // The driver waits out the excess before fetching.
                buffer_seconds = self.config.max_buffer_seconds - segment;
            }
            if fetch_seconds > buffer_seconds {
                rebuffering += fetch_seconds - buffer_seconds;
                buffer_seconds = 0.0;
            } else {
                buffer_seconds -= fetch_seconds;
            }
            buffer_seconds += segment;
        }
        rebuffering
    }
}

impl MultiviewAbrController for ModelPredictiveController {
    fn control_action(&self, ctx: &ControllerContext<'_>) -> ControlAction {
        let streams = self.config.stream_count;
        let ladder = &self.config.bitrates_mbps;
        let segment = self.config.segment_seconds;
        let horizon = self.options.horizon_groups.max(1);
        let lowest = vec![0usize; streams];

        let rate_mbps = self.config.rebuffer_safety * ctx.throughput_mbps;
        if !(rate_mbps > 0.0) || !rate_mbps.is_finite() {
            return ControlAction {
                wait_group_count: 0,
                bitrate_ids: lowest,
            };
        }

        let distributions =
            ctx.view_predictor
                .predict_primary_stream_distributions(0.0, horizon, segment);
        let expected_quality = |ids: &[usize], group: usize| -> f64 {
            let row = &distributions[group * streams..(group + 1) * streams];
            ids.iter().zip(row).map(|(&r, &p)| p * ladder[r]).sum()
        };

        // The grid may lag buffer_seconds (pure-context invocations); fall
        // back to whole groups of the last committed vector.
        let grid = ctx.buffered_bitrate_ids;
        let buffered = if grid.group_count() > 0 {
            grid.group_count()
        } else {
            (ctx.buffer_seconds / segment).round() as usize
        };
        let slots: Vec<&[usize]> = (0..buffered.min(horizon))
            .map(|g| {
                if g < grid.group_count() {
                    grid.group(g)
                } else {
                    ctx.last_bitrate_ids
                }
            })
            .collect();

        // Quality contributed by groups that play regardless of the action.
        let committed_quality: f64 = slots
            .iter()
            .enumerate()
            .map(|(g, ids)| expected_quality(ids, g))
            .sum();
        let appended_slots = horizon.saturating_sub(buffered);
        let downloads = appended_slots.max(1);

        let vectors = self.candidate_vectors();
        let budget_mb = ctx.throughput_mbps * horizon as f64 * segment / 8.0;
        let max_append_wait = if self.options.upgrade_aware {
            buffered.saturating_sub(1)
        } else {
            0
        };

        let mut best: Option<Candidate> = None;
        let mut consider = |candidate: Candidate| {
            if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        };

        // Append plans: play out `wait` groups, then fetch `ids` repeatedly.
        for wait in 0..=max_append_wait {
            let start_buffer = (ctx.buffer_seconds - wait as f64 * segment).max(0.0);
            for (ids, size_mb) in &vectors {
                if *size_mb > budget_mb {
                    continue;
                }
                let appended_quality: f64 = (buffered..horizon)
                    .map(|g| expected_quality(ids, g))
                    .sum();
                let fetch = 8.0 * size_mb / rate_mbps;
                let rebuffering = self.rollout_rebuffering(start_buffer, fetch, downloads);
                consider(Candidate {
                    wait_group_count: wait,
                    bitrate_ids: ids.clone(),
                    score: committed_quality + appended_quality
                        - self.options.buffer_cost_weight * rebuffering,
                });
            }
        }

        // Upgrade plans: raise the head group in place, then stream the
        // rate-matched vector for the rest of the horizon.
        if self.options.upgrade_aware && buffered > 0 {
            let head = slots[0];
            let head_remaining =
                (ctx.buffer_seconds - (buffered - 1) as f64 * segment).clamp(0.0, segment);

            let mut primary = 0;
            for (stream, &mass) in distributions[..streams].iter().enumerate() {
                if mass > distributions[primary] {
                    primary = stream;
                }
            }
            let matched_rung = ladder.iter().rposition(|&mbps| mbps <= rate_mbps).unwrap_or(0);
            let mut matched_ids = vec![0usize; streams];
            matched_ids[primary] = matched_rung;
            let matched_size: f64 = matched_ids.iter().map(|&r| self.config.segment_mb(r)).sum();
            let matched_fetch = 8.0 * matched_size / rate_mbps;
            let matched_quality: f64 = (buffered..horizon)
                .map(|g| expected_quality(&matched_ids, g))
                .sum();

            for (ids, _) in &vectors {
                let dominates = ids.iter().zip(head).all(|(&new, &old)| new >= old)
                    && ids.iter().zip(head).any(|(&new, &old)| new > old);
                if !dominates {
                    continue;
                }
                let delta_mb: f64 = ids
                    .iter()
                    .zip(head)
                    .filter(|(&new, &old)| new > old)
                    .map(|(&new, _)| self.config.segment_mb(new))
                    .sum();
                let fetch = 8.0 * delta_mb / rate_mbps;
                if fetch > head_remaining {
                    continue;
                }
                let quality = committed_quality - expected_quality(head, 0)
                    + expected_quality(ids, 0)
                    + matched_quality;
                let rebuffering = self.rollout_rebuffering(
                    ctx.buffer_seconds - fetch,
                    matched_fetch,
                    appended_slots,
                );
                consider(Candidate {
                    wait_group_count: buffered,
                    bitrate_ids: ids.clone(),
                    score: quality - self.options.buffer_cost_weight * rebuffering,
                });
            }
        }

        match best {
            Some(candidate) => ControlAction {
                wait_group_count: candidate.wait_group_count,
                bitrate_ids: candidate.bitrate_ids,
            },
            None => ControlAction {
                wait_group_count: 0,
                bitrate_ids: lowest,
            },
        }
    }
}
