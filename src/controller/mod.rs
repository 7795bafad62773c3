//! ABR controllers.
//!
//! A controller is invoked once per driver iteration with an immutable
//! snapshot of the session state and answers with a [`ControlAction`]:
//! how many buffered groups to play out before the next download, and the
//! per-stream bitrate rungs for that download.
//!
//! Controllers are stateless beyond construction; everything mutable lives
//! in the [`ControllerContext`].

mod model_predictive;
mod throughput_based;

pub use model_predictive::{ModelPredictiveController, ModelPredictiveControllerOptions};
pub use throughput_based::{ThroughputBasedController, ThroughputBasedControllerOptions};

use serde::{Deserialize, Serialize};

use crate::config::StreamingConfig;
use crate::view::ViewPredictor;

/// Bitrate-ladder indices currently committed to the playback buffer.
///
/// Row-major `[groups_in_buffer x stream_count]` grid stored flat with the
/// stream count as the row stride. Row 0 is the head group (next to play).
#[derive(Debug, Clone)]
pub struct BufferedBitrateIds {
    stream_count: usize,
    ids: Vec<usize>,
}

impl BufferedBitrateIds {
    pub fn new(stream_count: usize) -> Self {
        assert!(stream_count >= 1, "stream count must be at least 1");
        BufferedBitrateIds {
            stream_count,
            ids: Vec::new(),
        }
    }

    pub fn stream_count(&self) -> usize {
        self.stream_count
    }

    pub fn group_count(&self) -> usize {
        self.ids.len() / self.stream_count
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Bitrate IDs of buffered group `g` (0 = head).
    pub fn group(&self, g: usize) -> &[usize] {
        &self.ids[g * self.stream_count..(g + 1) * self.stream_count]
    }

    /// Appends a group at the tail of the buffer.
    pub fn push_group(&mut self, bitrate_ids: &[usize]) {
        assert_eq!(bitrate_ids.len(), self.stream_count);
        self.ids.extend_from_slice(bitrate_ids);
    }

    /// Removes the head group once it has fully played out.
    pub fn pop_front_group(&mut self) {
        assert!(!self.ids.is_empty(), "pop from empty buffer");
        self.ids.drain(..self.stream_count);
    }

    /// Replaces the head group's bitrate IDs (upgrade commit).
    pub fn replace_head(&mut self, bitrate_ids: &[usize]) {
        assert_eq!(bitrate_ids.len(), self.stream_count);
        self.ids[..self.stream_count].copy_from_slice(bitrate_ids);
    }
}

/// One controller decision.
///
/// Play out `wait_group_count` buffered groups, then download one segment
/// group at `bitrate_ids`. When `wait_group_count` equals the number of
/// buffered groups (and the buffer is non-empty) the action is instead a
/// pure upgrade: nothing is played out and the download replaces the head
/// group with the elementwise-raised bitrate vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlAction {
    pub wait_group_count: usize,
    pub bitrate_ids: Vec<usize>,
}

/// Immutable inputs to one controller invocation.
pub struct ControllerContext<'a> {
    /// Playback time currently buffered, in seconds.
    pub buffer_seconds: f64,
    /// Bitrate grid of the committed groups (may lag `buffer_seconds` in
    /// unit-test contexts; controllers fall back to `last_bitrate_ids`).
    pub buffered_bitrate_ids: &'a BufferedBitrateIds,
    /// Mean throughput forecast from the throughput predictor, in Mbps.
    pub throughput_mbps: f64,
    /// Bitrate vector of the most recently downloaded fresh group.
    pub last_bitrate_ids: &'a [usize],
    /// Handle for forecasting the primary view over upcoming groups.
    pub view_predictor: &'a dyn ViewPredictor,
}

/// Capability set shared by all controllers.
pub trait MultiviewAbrController {
    fn control_action(&self, ctx: &ControllerContext<'_>) -> ControlAction;
}

/// Tagged options for building a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControllerOptions {
    ThroughputBased(ThroughputBasedControllerOptions),
    ModelPredictive(ModelPredictiveControllerOptions),
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions::ThroughputBased(ThroughputBasedControllerOptions::default())
    }
}

impl ControllerOptions {
    /// Builds the controller variant selected by this options value.
    pub fn build(&self, config: &StreamingConfig) -> ControllerKind {
        match self {
            ControllerOptions::ThroughputBased(options) => ControllerKind::ThroughputBased(
                ThroughputBasedController::new(config.clone(), options.clone()),
            ),
            ControllerOptions::ModelPredictive(options) => ControllerKind::ModelPredictive(
                ModelPredictiveController::new(config.clone(), options.clone()),
            ),
        }
    }
}

/// Runtime controller; shares its discriminant with the options enum.
#[derive(Debug, Clone)]
pub enum ControllerKind {
    ThroughputBased(ThroughputBasedController),
    ModelPredictive(ModelPredictiveController),
}

impl MultiviewAbrController for ControllerKind {
    fn control_action(&self, ctx: &ControllerContext<'_>) -> ControlAction {
        match self {
            ControllerKind::ThroughputBased(c) => c.control_action(ctx),
            ControllerKind::ModelPredictive(c) => c.control_action(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_grid_pushes_and_pops_in_order() {
        let mut grid = BufferedBitrateIds::new(2);
        assert!(grid.is_empty());
        grid.push_group(&[1, 0]);
        grid.push_group(&[3, 2]);
        assert_eq!(grid.group_count(), 2);
        assert_eq!(grid.group(0), &[1, 0]);
        assert_eq!(grid.group(1), &[3, 2]);

        grid.pop_front_group();
        assert_eq!(grid.group_count(), 1);
        assert_eq!(grid.group(0), &[3, 2]);
    }

    #[test]
    fn replace_head_overwrites_only_row_zero() {
        let mut grid = BufferedBitrateIds::new(2);
        grid.push_group(&[0, 0]);
        grid.push_group(&[1, 1]);
        grid.replace_head(&[2, 0]);
        assert_eq!(grid.group(0), &[2, 0]);
        assert_eq!(grid.group(1), &[1, 1]);
    }

    #[test]
    fn controller_options_tag_round_trips() {
        let options = ControllerOptions::ModelPredictive(ModelPredictiveControllerOptions::default());
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"type\":\"ModelPredictive\""));
        let back: ControllerOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
