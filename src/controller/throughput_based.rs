//! Rate-matched single-segment controller.

use serde::{Deserialize, Serialize};

use super::{ControlAction, ControllerContext, MultiviewAbrController};
use crate::config::StreamingConfig;
use crate::view::ViewPredictor as _;

/// Options for [`ThroughputBasedController`]. The policy has no knobs; the
/// struct exists so the options enum carries a uniform discriminant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThroughputBasedControllerOptions {}

/// Classic rate-matched ABR, multiview-aware only in where it spends.
///
/// The likeliest primary view gets the highest rung whose bitrate fits
/// under `rebuffer_safety * predicted_throughput`; every other view gets
/// the lowest rung. Buffer growth is starved (one group played out before
/// the next fetch) only when the buffer is within one segment of capacity.
#[derive(Debug, Clone)]
pub struct ThroughputBasedController {
    config: StreamingConfig,
}

impl ThroughputBasedController {
    pub fn new(config: StreamingConfig, _options: ThroughputBasedControllerOptions) -> Self {
        ThroughputBasedController { config }
    }
}

impl MultiviewAbrController for ThroughputBasedController {
    fn control_action(&self, ctx: &ControllerContext<'_>) -> ControlAction {
        let stream_count = self.config.stream_count;
        let distribution = ctx.view_predictor.predict_primary_stream_distributions(
            0.0,
            1,
            self.config.segment_seconds,
        );
        // First maximum wins so ties resolve to the lowest stream index.
        let mut primary = 0;
        for (stream, &mass) in distribution.iter().enumerate() {
            if mass > distribution[primary] {
                primary = stream;
            }
        }

        let cap_mbps = self.config.rebuffer_safety * ctx.throughput_mbps;
        let rung = self
            .config
            .bitrates_mbps
            .iter()
            .rposition(|&mbps| mbps <= cap_mbps)
            .unwrap_or(0);

        let mut bitrate_ids = vec![0; stream_count];
        bitrate_ids[primary] = rung;

        // Starve buffer growth only when full, and only if a whole group
        // is actually there to play out.
        let full = ctx.buffer_seconds
            >= self.config.max_buffer_seconds - self.config.segment_seconds
            && ctx.buffer_seconds >= self.config.segment_seconds;
        ControlAction {
            wait_group_count: usize::from(full),
            bitrate_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::BufferedBitrateIds;
    use crate::view::{StaticPredictor, StaticPredictorOptions, ViewPredictorKind};

    fn config() -> StreamingConfig {
        StreamingConfig {
            segment_seconds: 1.0,
            bitrates_mbps: vec![1.0, 2.0, 4.0, 8.0],
            stream_count: 4,
            rebuffer_safety: 0.75,
            max_buffer_seconds: 5.0,
        }
    }

    fn action(throughput_mbps: f64, buffer_seconds: f64) -> ControlAction {
        let controller =
            ThroughputBasedController::new(config(), ThroughputBasedControllerOptions::default());
        let predictor =
            ViewPredictorKind::Static(StaticPredictor::new(4, StaticPredictorOptions::default()));
        let grid = BufferedBitrateIds::new(4);
        let last = vec![0; 4];
        controller.control_action(&ControllerContext {
            buffer_seconds,
            buffered_bitrate_ids: &grid,
            throughput_mbps,
            last_bitrate_ids: &last,
            view_predictor: &predictor,
        })
    }

    #[test]
    fn primary_rung_tracks_safe_throughput() {
        assert_eq!(action(5.0, 0.0).bitrate_ids, vec![1, 0, 0, 0]);
        assert_eq!(action(10.0, 0.0).bitrate_ids, vec![2, 0, 0, 0]);
        assert_eq!(action(15.0, 0.0).bitrate_ids, vec![3, 0, 0, 0]);
    }

    #[test]
    fn no_estimate_selects_lowest_rung() {
        let act = action(0.0, 0.0);
        assert_eq!(act.bitrate_ids, vec![0, 0, 0, 0]);
        assert_eq!(act.wait_group_count, 0);
    }

    #[test]
    fn waits_only_when_buffer_near_capacity() {
        assert_eq!(action(10.0, 3.9).wait_group_count, 0);
        assert_eq!(action(10.0, 4.0).wait_group_count, 1);
        assert_eq!(action(10.0, 5.0).wait_group_count, 1);
    }

    #[test]
    fn spends_on_the_likeliest_primary_view() {
        let controller =
            ThroughputBasedController::new(config(), ThroughputBasedControllerOptions::default());
        let predictor = ViewPredictorKind::Static(StaticPredictor::new(
            4,
            StaticPredictorOptions {
                distribution: Some(vec![0.1, 0.2, 0.6, 0.1]),
            },
        ));
        let grid = BufferedBitrateIds::new(4);
        let last = vec![0; 4];
        let act = controller.control_action(&ControllerContext {
            buffer_seconds: 0.0,
            buffered_bitrate_ids: &grid,
            throughput_mbps: 15.0,
            last_bitrate_ids: &last,
            view_predictor: &predictor,
        });
        assert_eq!(act.bitrate_ids, vec![0, 0, 3, 0]);
    }
}
