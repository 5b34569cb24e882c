//! Mock construction helpers

use perfmeter::{FrameCounters, MeterObserver, MetricSnapshot, ScriptedSource};
use std::time::{Duration, Instant};

/// Scripted source on one core with the given process loads
pub fn create_test_source(process_loads: &[f64]) -> ScriptedSource {
    ScriptedSource::new()
        .with_process_loads(process_loads.iter().copied())
        .with_core_count(1)
}

/// Record `n` pulses, every one of them rendering a frame
pub fn record_rendered_pulses(counters: &FrameCounters, n: u64) {
    for _ in 0..n {
        counters.record_pulse(true);
    }
}

/// Poll until a snapshot satisfies `pred` or `timeout` passes
pub fn wait_for(
    observer: &mut MeterObserver,
    timeout: Duration,
    mut pred: impl FnMut(&MetricSnapshot) -> bool,
) -> Option<MetricSnapshot> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(snapshot) = observer.recv_timeout(Duration::from_millis(20)) {
            if pred(&snapshot) {
                return Some(snapshot);
            }
        }
    }
    None
}
