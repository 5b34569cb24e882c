//! Integration tests for tick semantics
//!
//! Drives the public [`Sampler`] directly with explicit timestamps, so every
//! scenario is deterministic.

mod common;

use common::assert_metric;
use common::mock_helpers::create_test_source;
use perfmeter::{MetricKind, Sampler, SamplerConfig, ScriptedSource, UNAVAILABLE};

#[test]
fn test_documented_process_load_scenario() {
    let config = SamplerConfig::new(100, 0.5);
    let mut source = create_test_source(&[0.2, 0.4, 0.6]);
    let mut sampler = Sampler::new(config.smoothing_alpha, 0);

    let smoothed: Vec<f64> = (1..=3)
        .map(|t| sampler.tick(t * 100, &mut source).average_process_cpu_load())
        .collect();

    // One core: a load of 0.2 is 20%.
    assert_metric("smoothed", smoothed[0], 20.0);
    assert_metric("smoothed", smoothed[1], 30.0);
    assert_metric("smoothed", smoothed[2], 45.0);

    let cpu = sampler.metrics().get(MetricKind::ProcessCpuLoad);
    assert_metric("min", cpu.min(), 20.0);
    assert_metric("max", cpu.max(), 60.0);
}

#[test]
fn test_smoothed_series_follows_recurrence() {
    let loads = [0.9, 0.1, 0.5, 0.7, 0.3, 0.3, 0.8];
    let alpha = 0.2;
    let mut source = create_test_source(&loads);
    let mut sampler = Sampler::new(alpha, 0);

    let mut expected: Option<f64> = None;
    for (i, &load) in loads.iter().enumerate() {
        let snapshot = sampler.tick((i as i64 + 1) * 100, &mut source);
        let raw = load * 100.0;
        let want = expected.map_or(raw, |prev| (1.0 - alpha) * prev + alpha * raw);
        assert_metric("tick", snapshot.average_process_cpu_load(), want);
        expected = Some(want);
    }
}

#[test]
fn test_alpha_one_is_pass_through() {
    let loads = [0.1, 0.9, 0.4];
    let mut source = create_test_source(&loads);
    let mut sampler = Sampler::new(1.0, 0);

    for (i, &load) in loads.iter().enumerate() {
        let snapshot = sampler.tick((i as i64 + 1) * 100, &mut source);
        assert_metric("tick", snapshot.average_process_cpu_load(), load * 100.0);
    }
}

#[test]
fn test_zero_pulses_is_zero_rate() {
    let mut source = ScriptedSource::new().with_pulse_counts([0]);
    let mut sampler = Sampler::new(0.5, 0);
    let snapshot = sampler.tick(100, &mut source);
    assert_eq!(snapshot.pulse_rate(), 0.0);
    assert_eq!(snapshot.average_pulse_rate(), 0.0);
}

#[test]
fn test_duplicate_timestamp_is_sentinel() {
    let mut source = ScriptedSource::new().with_pulse_counts([10, 10]);
    let mut sampler = Sampler::new(0.5, 0);

    let first = sampler.tick(100, &mut source);
    assert_metric("pulse_rate", first.pulse_rate(), 100.0);

    let second = sampler.tick(100, &mut source);
    assert_eq!(second.pulse_rate(), UNAVAILABLE);
    assert_metric("average_pulse_rate", second.average_pulse_rate(), 100.0);
}

#[test]
fn test_reset_restarts_trend() {
    let mut source = create_test_source(&[0.9, 0.9, 0.1]);
    let mut sampler = Sampler::new(0.01, 0);
    sampler.tick(100, &mut source);
    sampler.tick(200, &mut source);

    sampler.request_reset();
    let snapshot = sampler.tick(300, &mut source);
    assert_metric("average_process_cpu_load", snapshot.average_process_cpu_load(), 10.0);
    assert_metric("min_process_cpu_load", snapshot.min_process_cpu_load(), 10.0);
    assert_metric("max_process_cpu_load", snapshot.max_process_cpu_load(), 10.0);
}

#[test]
fn test_snapshots_are_sequenced() {
    let mut source = ScriptedSource::new();
    let mut sampler = Sampler::new(0.5, 0);
    let sequences: Vec<u64> = (1..=4)
        .map(|t| sampler.tick(t * 40, &mut source).sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
}

#[test]
fn test_period_bounds() {
    assert_eq!(SamplerConfig::new(1, 0.01).effective_period_millis(), 40);
    assert_eq!(SamplerConfig::new(50_000, 0.01).effective_period_millis(), 10_000);
}
