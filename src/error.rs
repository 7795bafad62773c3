//! Error taxonomy for the simulator.
//!
//! Three failure classes, detected at different stages:
//! - [`ConfigError`] — contradictory session parameters, caught before any
//!   work starts.
//! - [`ShapeError`] — caller-supplied buffers or batches whose dimensions
//!   disagree with the session geometry, caught before any work starts.
//! - [`DataError`] — invalid samples inside one input series. Aborts only
//!   the offending session; other sessions in a batch continue.
//!
//! Non-finite predictor outputs are not errors: the driver clamps them to
//! zero and emits a `tracing` warning. Contract violations inside the core
//! (negative download sizes, malformed control actions) are programmer
//! errors and panic.

use thiserror::Error;

/// Contradictory streaming configuration. Detected at session start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("bitrate ladder is empty")]
    EmptyLadder,
    #[error("bitrate ladder must be positive and strictly ascending (rung {index}: {value} Mbps)")]
    LadderNotAscending { index: usize, value: f64 },
    #[error("stream count must be at least 1")]
    NoStreams,
    #[error("segment duration must be positive (got {0} s)")]
    NonPositiveSegment(f64),
    #[error("rebuffer safety must be in (0, 1] (got {0})")]
    SafetyOutOfRange(f64),
    #[error("max buffer duration must be positive (got {0} s)")]
    NonPositiveMaxBuffer(f64),
    #[error("max buffer ({max_buffer_seconds} s) cannot hold one segment ({segment_seconds} s)")]
    BufferSmallerThanSegment {
        max_buffer_seconds: f64,
        segment_seconds: f64,
    },
}

/// Caller-supplied dimensions disagree with the session geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("network batch has {network} series but primary-stream batch has {primary}")]
    SessionCountMismatch { network: usize, primary: usize },
    #[error("primary-stream series {session} spans {got} groups, expected {expected}")]
    GroupCountMismatch {
        session: usize,
        got: usize,
        expected: usize,
    },
    #[error("output grid is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    OutputGridMismatch {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
}

/// Invalid sample inside one input series. Aborts only that session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("non-positive tick interval {0} s")]
    NonPositiveTick(f64),
    #[error("empty series")]
    EmptySeries,
    #[error("non-positive throughput sample {value} Mbps at index {index}")]
    NonPositiveThroughput { index: usize, value: f64 },
    #[error("primary stream ID {id} at index {index} outside [0, {stream_count})")]
    StreamIdOutOfRange {
        index: usize,
        id: i64,
        stream_count: usize,
    },
}

/// Top-level error returned by the batch entry point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Data(#[from] DataError),
}
