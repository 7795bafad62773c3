//! # Integration tests: full sessions through the public entry point
//!
//! These drive complete simulations (predictors, controller, network
//! model, and metrics) through `simulate`, the same surface a host
//! binding would call.

use multiview_abr_sim::batch::simulate;
use multiview_abr_sim::controller::{
    ControllerOptions, ModelPredictiveControllerOptions, ThroughputBasedControllerOptions,
};
use multiview_abr_sim::series::{
    NetworkDataView, NetworkSeriesView, PrimaryStreamDataView, PrimaryStreamSeriesView,
};
use multiview_abr_sim::simulator::PredictorOptions;
use multiview_abr_sim::throughput::{EmaPredictorOptions, ThroughputPredictorOptions};
use multiview_abr_sim::view::{MarkovPredictorOptions, ViewPredictorOptions};
use multiview_abr_sim::StreamingConfig;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn multiview_config() -> StreamingConfig {
    StreamingConfig {
        segment_seconds: 1.0,
        bitrates_mbps: vec![1.0, 2.0, 4.0, 8.0],
        stream_count: 4,
        rebuffer_safety: 0.75,
        max_buffer_seconds: 5.0,
    }
}

fn batch_of_one<'a>(
    throughputs: &'a [f64],
    network_tick: f64,
    ids: &'a [i64],
    view_tick: f64,
) -> (NetworkDataView<'a>, PrimaryStreamDataView<'a>) {
    (
        NetworkDataView {
            series: vec![NetworkSeriesView {
                tick_seconds: network_tick,
                throughputs_mbps: throughputs,
            }],
        },
        PrimaryStreamDataView {
            series: vec![PrimaryStreamSeriesView {
                tick_seconds: view_tick,
                primary_stream_ids: ids,
            }],
        },
    )
}

fn assert_invariants(config: &StreamingConfig, data: &multiview_abr_sim::SimulationData) {
    for session in 0..data.session_count() {
        assert!(data.rebuffering_seconds[session] >= 0.0);
        assert!(data.downloaded_mb[session] >= 0.0);
        assert!(data.raw_wasted_mb[session] >= 0.0);
        assert!(
            data.raw_wasted_mb[session] <= data.downloaded_mb[session] + 1e-9,
            "session {session}: wasted {} > downloaded {}",
            data.raw_wasted_mb[session],
            data.downloaded_mb[session]
        );
        let (_, groups, streams) = data.buffered_bitrates_mbps.dims();
        for group in 0..groups {
            for stream in 0..streams {
                let mbps = data.buffered_bitrates_mbps.at(session, group, stream);
                assert!(
                    config.bitrates_mbps.iter().any(|&b| (b - mbps).abs() < 1e-12),
                    "session {session} group {group} stream {stream}: {mbps} not on the ladder"
                );
            }
            let row_sum: f64 = (0..streams)
                .map(|s| data.primary_stream_distributions.at(session, group, s))
                .sum();
            assert!(
                (row_sum - 1.0).abs() < 1e-9,
                "session {session} group {group}: distribution sums to {row_sum}"
            );
        }
    }
}

// ─── Throughput-based end to end ────────────────────────────────────────────

#[test]
fn throughput_based_session_hits_pinned_metrics() {
    init_tracing();
    let throughputs = [8.0, 32.0, 24.0, 16.0];
    let ids = vec![0i64; 20];
    let (network, primary) = batch_of_one(&throughputs, 1.0, &ids, 0.2);
    let data = simulate(
        &multiview_config(),
        &ControllerOptions::ThroughputBased(ThroughputBasedControllerOptions::default()),
        &network,
        &primary,
        &PredictorOptions::default(),
    )
    .unwrap();

    assert_eq!(data.rebuffering_seconds[0], 0.0);
    #[rustfmt::skip]
    let expected = [
        1.0, 1.0, 1.0, 1.0,
        4.0, 1.0, 1.0, 1.0,
        4.0, 1.0, 1.0, 1.0,
        8.0, 1.0, 1.0, 1.0,
    ];
    assert_eq!(data.buffered_bitrates_mbps.session(0), &expected[..]);
    for group in 0..4 {
        assert_eq!(data.primary_stream_distributions.at(0, group, 0), 1.0);
    }
    assert!((data.downloaded_mb[0] - 3.625).abs() < 1e-12);
    assert_eq!(data.raw_wasted_mb[0], 0.0);
    assert_invariants(&multiview_config(), &data);
}

// ─── Model-predictive end to end ────────────────────────────────────────────

#[test]
fn model_predictive_upgrades_a_blind_first_fetch() {
    init_tracing();
    // The opening group is fetched blind at the lowest rungs; with a fat
    // link the planner immediately re-downloads the watched stream at a
    // higher rung, discarding the original bytes.
    let throughputs = [40.0];
    let ids = vec![0i64; 12];
    let (network, primary) = batch_of_one(&throughputs, 1.0, &ids, 1.0);
    let config = multiview_config();
    let data = simulate(
        &config,
        &ControllerOptions::ModelPredictive(ModelPredictiveControllerOptions::default()),
        &network,
        &primary,
        &PredictorOptions::default(),
    )
    .unwrap();

    assert_eq!(data.rebuffering_seconds[0], 0.0);
    assert!(
        data.raw_wasted_mb[0] > 0.0,
        "expected upgrade waste, got none"
    );
    // The upgraded head now reports the raised bitrate.
    assert_eq!(data.buffered_bitrates_mbps.at(0, 0, 0), 8.0);
    assert_invariants(&config, &data);
}

#[test]
fn model_predictive_session_with_markov_views_holds_invariants() {
    init_tracing();
    let throughputs = [12.0, 20.0, 6.0, 16.0, 24.0, 10.0];
    // The viewer wanders between views during the session.
    let ids: Vec<i64> = (0..24).map(|i| ((i / 4) % 4) as i64).collect();
    let (network, primary) = batch_of_one(&throughputs, 1.0, &ids, 0.25);
    let config = multiview_config();
    let data = simulate(
        &config,
        &ControllerOptions::ModelPredictive(ModelPredictiveControllerOptions {
            upgrade_aware: true,
            ..ModelPredictiveControllerOptions::default()
        }),
        &network,
        &primary,
        &PredictorOptions {
            throughput: ThroughputPredictorOptions::Ema(EmaPredictorOptions::default()),
            view: ViewPredictorOptions::Markov(MarkovPredictorOptions::default()),
        },
    )
    .unwrap();

    assert_eq!(data.buffered_bitrates_mbps.dims(), (1, 6, 4));
    assert!(data.downloaded_mb[0] > 0.0);
    assert_invariants(&config, &data);
}

// ─── Determinism and dominance ──────────────────────────────────────────────

#[test]
fn repeated_runs_are_bit_identical() {
    let throughputs = [9.0, 3.0, 17.0, 11.0, 5.0];
    let ids: Vec<i64> = (0..20).map(|i| (i % 3) as i64).collect();
    let (network, primary) = batch_of_one(&throughputs, 1.0, &ids, 0.25);
    let config = multiview_config();
    let options = ControllerOptions::ModelPredictive(ModelPredictiveControllerOptions::default());
    let predictors = PredictorOptions {
        throughput: ThroughputPredictorOptions::Ema(EmaPredictorOptions::default()),
        view: ViewPredictorOptions::Markov(MarkovPredictorOptions::default()),
    };

    let first = simulate(&config, &options, &network, &primary, &predictors).unwrap();
    let second = simulate(&config, &options, &network, &primary, &predictors).unwrap();

    assert_eq!(first.rebuffering_seconds, second.rebuffering_seconds);
    assert_eq!(
        first.buffered_bitrates_mbps.as_slice(),
        second.buffered_bitrates_mbps.as_slice()
    );
    assert_eq!(
        first.primary_stream_distributions.as_slice(),
        second.primary_stream_distributions.as_slice()
    );
    assert_eq!(first.downloaded_mb, second.downloaded_mb);
    assert_eq!(first.raw_wasted_mb, second.raw_wasted_mb);
}

#[test]
fn faster_network_never_rebuffers_more() {
    // Single-rung ladder: downloads are identical, so uniformly scaling
    // the link up can only shorten stalls.
    let config = StreamingConfig {
        segment_seconds: 1.0,
        bitrates_mbps: vec![4.0],
        stream_count: 2,
        rebuffer_safety: 0.75,
        max_buffer_seconds: 5.0,
    };
    let base = [2.0, 5.0, 1.5, 4.0, 3.0, 2.5];
    let ids = vec![0i64; 12];

    let mut last_rebuffering = f64::INFINITY;
    for scale in [1.0, 1.5, 2.0, 4.0] {
        let scaled: Vec<f64> = base.iter().map(|t| t * scale).collect();
        let (network, primary) = batch_of_one(&scaled, 1.0, &ids, 0.5);
        let data = simulate(
            &config,
            &ControllerOptions::default(),
            &network,
            &primary,
            &PredictorOptions::default(),
        )
        .unwrap();
        assert!(
            data.rebuffering_seconds[0] <= last_rebuffering + 1e-9,
            "scale {scale} rebuffers {} > previous {last_rebuffering}",
            data.rebuffering_seconds[0]
        );
        last_rebuffering = data.rebuffering_seconds[0];
    }
}
