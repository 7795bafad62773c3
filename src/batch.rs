//! Batch runner over many simulation sessions.
//!
//! The entry point [`simulate`] iterates the session axis (one session per
//! primary-stream series), drives each session independently through the
//! [`crate::simulator`] driver, and collects the per-session metrics into
//! owned output tensors shaped `[session x group x stream]`.
//!
//! Sessions are pure functions of their inputs: a failed session leaves its
//! output region zeroed and is reported in the `session_errors` side
//! channel without disturbing any other session.

use tracing::warn;

use crate::config::StreamingConfig;
use crate::controller::ControllerOptions;
use crate::error::{DataError, ShapeError, SimulationError};
use crate::series::{NetworkDataView, PrimaryStreamDataView};
use crate::simulator::{simulate_session, MatrixViewMut, PredictorOptions, SimulationSeriesRef};

/// Owned `[session x group x stream]` tensor stored flat, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3 {
    data: Vec<f64>,
    sessions: usize,
    groups: usize,
    streams: usize,
}

impl Tensor3 {
    fn zeros(sessions: usize, groups: usize, streams: usize) -> Self {
        Tensor3 {
            data: vec![0.0; sessions * groups * streams],
            sessions,
            groups,
            streams,
        }
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        (self.sessions, self.groups, self.streams)
    }

    pub fn at(&self, session: usize, group: usize, stream: usize) -> f64 {
        self.data[(session * self.groups + group) * self.streams + stream]
    }

    /// Flat `[group x stream]` slice for one session.
    pub fn session(&self, session: usize) -> &[f64] {
        let len = self.groups * self.streams;
        &self.data[session * len..(session + 1) * len]
    }

    fn session_mut(&mut self, session: usize) -> &mut [f64] {
        let len = self.groups * self.streams;
        &mut self.data[session * len..(session + 1) * len]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Batch simulation results, one entry per session.
#[derive(Debug, Clone)]
pub struct SimulationData {
    pub rebuffering_seconds: Vec<f64>,
    pub buffered_bitrates_mbps: Tensor3,
    pub primary_stream_distributions: Tensor3,
    pub downloaded_mb: Vec<f64>,
    pub raw_wasted_mb: Vec<f64>,
    /// Side channel: sessions aborted by bad input data. The output
    /// regions of such sessions stay zeroed.
    pub session_errors: Vec<Option<DataError>>,
}

impl SimulationData {
    pub fn session_count(&self) -> usize {
        self.rebuffering_seconds.len()
    }
}

/// Simulates a streaming configuration over a batch of network and
/// primary-view series.
///
/// The batches must pair up one-to-one, and every primary-stream series
/// must span the same number of segment groups. Configuration and shape
/// problems abort the whole batch; per-session data problems abort only
/// the affected session.
pub fn simulate(
    config: &StreamingConfig,
    controller_options: &ControllerOptions,
    network_data: &NetworkDataView<'_>,
    primary_stream_data: &PrimaryStreamDataView<'_>,
    predictor_options: &PredictorOptions,
) -> Result<SimulationData, SimulationError> {
    config.validate()?;
    let sessions = primary_stream_data.session_count();
    if network_data.session_count() != sessions {
        return Err(ShapeError::SessionCountMismatch {
            network: network_data.session_count(),
            primary: sessions,
        }
        .into());
    }

    // Series that will fail their own validation are skipped here; they
    // surface as per-session data errors instead of a batch-wide abort.
    let well_formed =
        |series: &crate::series::PrimaryStreamSeriesView<'_>| series.tick_seconds > 0.0;
    let group_count = primary_stream_data
        .series
        .iter()
        .find(|series| well_formed(series))
        .map(|series| group_count_of(series.duration_seconds(), config.segment_seconds))
        .unwrap_or(0);
    for (session, series) in primary_stream_data.series.iter().enumerate() {
        if !well_formed(series) {
            continue;
        }
        let got = group_count_of(series.duration_seconds(), config.segment_seconds);
        if got != group_count {
            return Err(ShapeError::GroupCountMismatch {
                session,
                got,
                expected: group_count,
            }
            .into());
        }
    }

    let streams = config.stream_count;
    let mut data = SimulationData {
        rebuffering_seconds: vec![0.0; sessions],
        buffered_bitrates_mbps: Tensor3::zeros(sessions, group_count, streams),
        primary_stream_distributions: Tensor3::zeros(sessions, group_count, streams),
        downloaded_mb: vec![0.0; sessions],
        raw_wasted_mb: vec![0.0; sessions],
        session_errors: vec![None; sessions],
    };

    for session in 0..sessions {
        let mut output = SimulationSeriesRef {
            rebuffering_seconds: &mut data.rebuffering_seconds[session],
            buffered_bitrates_mbps: MatrixViewMut::new(
                data.buffered_bitrates_mbps.session_mut(session),
                group_count,
                streams,
            ),
            primary_stream_distributions: Some(MatrixViewMut::new(
                data.primary_stream_distributions.session_mut(session),
                group_count,
                streams,
            )),
            downloaded_mb: &mut data.downloaded_mb[session],
            raw_wasted_mb: &mut data.raw_wasted_mb[session],
        };
        let result = simulate_session(
            config,
            controller_options,
            network_data.series[session],
            primary_stream_data.series[session],
            predictor_options,
            &mut output,
        );
        match result {
            Ok(()) => {}
            Err(SimulationError::Data(error)) => {
                warn!(session, %error, "session aborted on bad input data");
                data.rebuffering_seconds[session] = 0.0;
                data.downloaded_mb[session] = 0.0;
                data.raw_wasted_mb[session] = 0.0;
                data.buffered_bitrates_mbps.session_mut(session).fill(0.0);
                data.primary_stream_distributions
                    .session_mut(session)
                    .fill(0.0);
                data.session_errors[session] = Some(error);
            }
            Err(other) => return Err(other),
        }
    }
    Ok(data)
}

fn group_count_of(duration_seconds: f64, segment_seconds: f64) -> usize {
    (duration_seconds / segment_seconds).round() as usize
}
