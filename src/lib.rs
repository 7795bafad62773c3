//! # multiview-abr-sim
//!
//! Discrete-event simulator for multiview adaptive-bitrate streaming
//! sessions. A client watches one "primary" view among several concurrent
//! views; the network delivers a time-varying throughput; an ABR controller
//! decides, segment group by segment group, which bitrate rung to download
//! for each view. The simulator reports rebuffering, delivered quality, and
//! bandwidth usage per session.
//!
//! ## Crate structure
//!
//! - [`config`] — immutable session parameters and their validation
//! - [`series`] — borrowed views over throughput and primary-view series
//! - [`network`] — simulated clock answering download-cost queries
//! - [`throughput`] — online bandwidth estimators (EMA, moving average)
//! - [`view`] — primary-view forecasters (Markov, static)
//! - [`controller`] — ABR policies (throughput-based, model-predictive)
//! - [`simulator`] — per-session driver writing metrics into caller buffers
//! - [`batch`] — batch runner over many (network, view) series pairs
//! - [`error`] — error taxonomy
//!
//! All units follow the streaming convention: megabits per second for
//! throughput and bitrate rungs, megabytes for download volumes, seconds
//! everywhere else. A rung of `r` Mbps over a `d`-second segment costs
//! `r * d / 8` MB.
//!
//! Sessions are deterministic: the same inputs always produce bit-identical
//! outputs. There is no randomness and no intra-session concurrency.

pub mod batch;
pub mod config;
pub mod controller;
pub mod error;
pub mod network;
pub mod series;
pub mod simulator;
pub mod throughput;
pub mod view;

pub use batch::{simulate, SimulationData};
pub use config::StreamingConfig;
pub use error::{ConfigError, DataError, ShapeError, SimulationError};
