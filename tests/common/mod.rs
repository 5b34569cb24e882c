//! Shared helpers for the integration tests

#![allow(dead_code)] // Not every test file uses every helper

pub mod builders;
pub mod mock_helpers;

use std::time::Duration;

/// Tolerance for comparing metric values produced by the sampler
pub const METRIC_EPSILON: f64 = 1e-9;

/// How long a test waits for a running sampler to publish
pub fn snapshot_wait() -> Duration {
    Duration::from_secs(5)
}

/// Assert a metric value, naming the metric when it differs
pub fn assert_metric(label: &str, actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < METRIC_EPSILON,
        "{}: got {}, expected {}",
        label,
        actual,
        expected
    );
}

/// Assert two floats are within `epsilon` of each other
pub fn assert_float_eq(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "got {}, expected {} (epsilon: {})",
        actual,
        expected,
        epsilon
    );
}
