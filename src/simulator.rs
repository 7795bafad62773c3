//! Per-session simulation driver.
//!
//! Drives one (network series, primary-stream series) pair to completion:
//! query the predictors, ask the controller for an action, play out and
//! download accordingly, then record metrics for every committed segment
//! group. The caller owns the output buffers; the driver writes but never
//! resizes them.

use tracing::{debug, trace, warn};

use crate::config::StreamingConfig;
use crate::controller::{
    BufferedBitrateIds, ControllerContext, ControllerOptions, MultiviewAbrController,
};
use crate::error::{ShapeError, SimulationError};
use crate::network::NetworkSimulator;
use crate::series::{NetworkSeriesView, PrimaryStreamSeriesView};
use crate::throughput::{ThroughputPredictor, ThroughputPredictorOptions};
use crate::view::{ViewPredictor, ViewPredictorOptions};

/// Tolerance for playback-boundary comparisons on accumulated clocks.
const TIME_EPSILON: f64 = 1e-9;

/// Mutable row-major 2-D view into caller-owned memory.
#[derive(Debug)]
pub struct MatrixViewMut<'a> {
    data: &'a mut [f64],
    rows: usize,
    cols: usize,
}

impl<'a> MatrixViewMut<'a> {
    /// Wraps a flat buffer; `data.len()` must equal `rows * cols`.
    pub fn new(data: &'a mut [f64], rows: usize, cols: usize) -> Self {
        assert_eq!(data.len(), rows * cols, "matrix view length mismatch");
        MatrixViewMut { data, rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }
}

/// Output views for one session, pre-allocated by the caller.
#[derive(Debug)]
pub struct SimulationSeriesRef<'a> {
    pub rebuffering_seconds: &'a mut f64,
    /// `[group x stream]` bitrates in Mbps of every committed group.
    pub buffered_bitrates_mbps: MatrixViewMut<'a>,
    /// Optional `[group x stream]` predicted primary-view distributions.
    pub primary_stream_distributions: Option<MatrixViewMut<'a>>,
    pub downloaded_mb: &'a mut f64,
    pub raw_wasted_mb: &'a mut f64,
}

/// Predictor selection for a session, bundled like the entry point takes it.
#[derive(Debug, Clone, Default)]
pub struct PredictorOptions {
    pub throughput: ThroughputPredictorOptions,
    pub view: ViewPredictorOptions,
}

/// Playback buffer state: committed groups plus the seconds of content not
/// yet played. Rebuffering accrues whenever wall time passes without
/// content to play, once playback has started.
struct PlaybackBuffer {
    segment_seconds: f64,
    grid: BufferedBitrateIds,
    seconds: f64,
    rebuffering_seconds: f64,
    started: bool,
}

impl PlaybackBuffer {
    fn new(stream_count: usize, segment_seconds: f64) -> Self {
        PlaybackBuffer {
            segment_seconds,
            grid: BufferedBitrateIds::new(stream_count),
            seconds: 0.0,
            rebuffering_seconds: 0.0,
            started: false,
        }
    }

    /// Passes `elapsed` seconds of wall time: drains playable content,
    /// charges the shortfall to rebuffering, and retires played-out groups.
    fn drain(&mut self, elapsed: f64) {
        if !self.started {
            return;
        }
        let drained = elapsed.min(self.seconds);
        self.rebuffering_seconds += elapsed - drained;
        self.seconds -= drained;
        self.pop_played();
    }

    fn pop_played(&mut self) {
        while self.grid.group_count() > 0
            && self.seconds
                <= (self.grid.group_count() - 1) as f64 * self.segment_seconds + TIME_EPSILON
        {
            self.grid.pop_front_group();
        }
    }

    /// Remaining playback time of the first `groups` buffered groups.
    fn time_to_play(&self, groups: usize) -> f64 {
        (self.seconds - (self.grid.group_count() - groups) as f64 * self.segment_seconds).max(0.0)
    }
}

/// Simulates one session, writing metrics into `output`.
///
/// The output grids must be shaped `[round(duration / segment) x
/// stream_count]`; a mismatch aborts with a [`ShapeError`] before any work.
pub fn simulate_session(
    config: &StreamingConfig,
    controller_options: &ControllerOptions,
    network_series: NetworkSeriesView<'_>,
    primary_stream_series: PrimaryStreamSeriesView<'_>,
    predictor_options: &PredictorOptions,
    output: &mut SimulationSeriesRef<'_>,
) -> Result<(), SimulationError> {
    config.validate()?;
    network_series.validate()?;
    primary_stream_series.validate(config.stream_count)?;

    let segment = config.segment_seconds;
    let stream_count = config.stream_count;
    let group_count =
        (primary_stream_series.duration_seconds() / segment).round() as usize;
    check_grid_shape(&output.buffered_bitrates_mbps, group_count, stream_count)?;
    if let Some(grid) = &output.primary_stream_distributions {
        check_grid_shape(grid, group_count, stream_count)?;
    }

    let controller = controller_options.build(config);
    let mut throughput_predictor = predictor_options.throughput.build();
    let mut view_predictor = predictor_options
        .view
        .build(stream_count, primary_stream_series.tick_seconds);
    let mut network = NetworkSimulator::new(network_series);
    let mut buffer = PlaybackBuffer::new(stream_count, segment);

    let mut downloaded_mb = 0.0;
    let mut raw_wasted_mb = 0.0;
    let mut last_bitrate_ids = vec![0usize; stream_count];
    let mut committed = 0usize;
    let mut fed_ticks = 0usize;

    while committed < group_count {
        let mut throughput_mbps = throughput_predictor.predict_throughput_mbps();
        if !throughput_mbps.is_finite() || throughput_mbps < 0.0 {
            warn!(throughput_mbps, "non-finite throughput forecast, clamping to zero");
            throughput_mbps = 0.0;
        }

        let action = controller.control_action(&ControllerContext {
            buffer_seconds: buffer.seconds,
            buffered_bitrate_ids: &buffer.grid,
            throughput_mbps,
            last_bitrate_ids: &last_bitrate_ids,
            view_predictor: &view_predictor,
        });
        let buffered_groups = buffer.grid.group_count();
        assert_eq!(
            action.bitrate_ids.len(),
            stream_count,
            "controller returned a bitrate vector of the wrong width"
        );
        assert!(
            action.bitrate_ids.iter().all(|&r| r < config.bitrate_count()),
            "controller returned a bitrate ID outside the ladder"
        );
        assert!(
            action.wait_group_count <= buffered_groups,
            "controller waits for more groups than are buffered"
        );
        debug!(
            committed,
            buffer_seconds = buffer.seconds,
            throughput_mbps,
            wait = action.wait_group_count,
            bitrate_ids = ?action.bitrate_ids,
            "control action"
        );

        let upgrade = buffered_groups > 0 && action.wait_group_count == buffered_groups;
        if upgrade {
            let head_index = committed - buffered_groups;
            let head = buffer.grid.group(0).to_vec();
            let merged: Vec<usize> = head
                .iter()
                .zip(&action.bitrate_ids)
                .map(|(&old, &new)| old.max(new))
                .collect();
            let mut delta_mb = 0.0;
            let mut discarded_mb = 0.0;
            for (&new, &old) in merged.iter().zip(&head) {
                if new > old {
                    delta_mb += config.segment_mb(new);
                    discarded_mb += config.segment_mb(old);
                }
            }
            if delta_mb <= 0.0 {
                // Nothing to raise: play out the head to keep moving.
                trace!("upgrade action without a raised stream, playing out head");
                let play = buffer.time_to_play(1);
                network.wait_for(play);
                buffer.drain(play);
            } else {
                let tv = network.download(delta_mb);
                downloaded_mb += tv.megabytes;
                buffer.drain(tv.seconds);
                throughput_predictor.update(tv.megabytes, tv.seconds);
                if committed - buffer.grid.group_count() == head_index {
                    // The head is still waiting: swap in the raised rungs.
                    buffer.grid.replace_head(&merged);
                    raw_wasted_mb += discarded_mb;
                    let row = output.buffered_bitrates_mbps.row_mut(head_index);
                    for (s, &rung) in merged.iter().enumerate() {
                        row[s] = config.bitrates_mbps[rung];
                    }
                } else {
                    // Played out mid-download: the new bytes arrive too late.
                    raw_wasted_mb += tv.megabytes;
                }
            }
        } else {
            if action.wait_group_count > 0 {
                let play = buffer.time_to_play(action.wait_group_count);
                network.wait_for(play);
                buffer.drain(play);
            }

            // Respect the buffer cap before fetching fresh content.
            if buffer.seconds + segment > config.max_buffer_seconds {
                let excess = buffer.seconds + segment - config.max_buffer_seconds;
                network.wait_for(excess);
                buffer.drain(excess);
            }

            let distribution_row = output.primary_stream_distributions.as_ref().map(|_| {
                view_predictor.predict_primary_stream_distributions(buffer.seconds, 1, segment)
            });

            let size_mb: f64 = action
                .bitrate_ids
                .iter()
                .map(|&rung| config.segment_mb(rung))
                .sum();
            let tv = network.download(size_mb);
            downloaded_mb += tv.megabytes;
            buffer.drain(tv.seconds);
            throughput_predictor.update(tv.megabytes, tv.seconds);

            buffer.grid.push_group(&action.bitrate_ids);
            buffer.seconds += segment;
            buffer.started = true;
            let index = committed;
            committed += 1;
            last_bitrate_ids.copy_from_slice(&action.bitrate_ids);

            let row = output.buffered_bitrates_mbps.row_mut(index);
            for (s, &rung) in action.bitrate_ids.iter().enumerate() {
                row[s] = config.bitrates_mbps[rung];
            }
            if let (Some(grid), Some(values)) =
                (&mut output.primary_stream_distributions, distribution_row)
            {
                grid.row_mut(index).copy_from_slice(&values);
            }
        }

        // Ground truth observed while the clock advanced.
        let available = ((network.clock_seconds() / primary_stream_series.tick_seconds).floor()
            as usize)
            .min(primary_stream_series.primary_stream_ids.len());
        if available > fed_ticks {
            view_predictor.update(&primary_stream_series.primary_stream_ids[fed_ticks..available]);
            fed_ticks = available;
        }

        debug_assert!(buffer.seconds >= -TIME_EPSILON);
        debug_assert!(buffer.seconds <= config.max_buffer_seconds + TIME_EPSILON);
    }

    *output.rebuffering_seconds = buffer.rebuffering_seconds;
    *output.downloaded_mb = downloaded_mb;
    *output.raw_wasted_mb = raw_wasted_mb;
    Ok(())
}

fn check_grid_shape(
    grid: &MatrixViewMut<'_>,
    group_count: usize,
    stream_count: usize,
) -> Result<(), ShapeError> {
    if grid.rows() != group_count || grid.cols() != stream_count {
        return Err(ShapeError::OutputGridMismatch {
            rows: grid.rows(),
            cols: grid.cols(),
            expected_rows: group_count,
            expected_cols: stream_count,
        });
    }
    Ok(())
}
