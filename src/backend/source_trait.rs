//! SampleSource trait for unified raw-reading access
//!
//! This module provides the seam between the sampler and whatever host
//! environment produces raw readings: OS CPU-load providers, host pulse
//! callbacks, render-completion hooks. The sampler only ever talks to a
//! [`SampleSource`]; how the readings are obtained is up to the host.
//!
//! Event counts are accumulated in [`FrameCounters`], a cheaply cloneable
//! pair of atomic counters. The host increments them from its own thread and
//! the source drains them on each tick.

use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unified interface for raw telemetry readings
///
/// Implementations must be `Send` so they can be moved onto the sampler
/// thread. Any call may fail for a single tick; the sampler logs the failure
/// and reports that metric as unavailable for that tick only.
///
/// # Example
///
/// ```ignore
/// fn total_load(source: &mut dyn SampleSource) -> Result<f64> {
///     Ok(source.system_cpu_load()? * source.core_count() as f64)
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait SampleSource: Send {
    /// CPU load of the current process as a fraction of the whole machine, in [0, 1]
    fn process_cpu_load(&mut self) -> Result<f64>;

    /// CPU load of the whole machine, in [0, 1]
    fn system_cpu_load(&mut self) -> Result<f64>;

    /// Host pulses since the previous call (read-and-reset)
    fn core_pulse_count(&mut self) -> Result<u64>;

    /// Rendered frames since the previous call (read-and-reset)
    fn core_frame_count(&mut self) -> Result<u64>;

    /// Number of logical cores, used to scale loads to 100% per core
    fn core_count(&self) -> usize;
}

#[derive(Debug, Default)]
struct CounterCells {
    pulses: AtomicU64,
    frames: AtomicU64,
}

/// Pulse and frame counters shared between the host and a sample source
///
/// Drains are a single atomic swap, so an increment racing with a drain is
/// counted in exactly one window.
#[derive(Debug, Clone, Default)]
pub struct FrameCounters {
    cells: Arc<CounterCells>,
}

impl FrameCounters {
    /// Create a fresh pair of counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one host pulse, and one frame if the pulse rendered anything
    pub fn record_pulse(&self, rendered: bool) {
        self.cells.pulses.fetch_add(1, Ordering::Relaxed);
        if rendered {
            self.cells.frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one rendered frame without a pulse
    pub fn record_frame(&self) {
        self.cells.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and reset the pulse counter
    pub fn drain_pulses(&self) -> u64 {
        self.cells.pulses.swap(0, Ordering::AcqRel)
    }

    /// Read and reset the frame counter
    pub fn drain_frames(&self) -> u64 {
        self.cells.frames.swap(0, Ordering::AcqRel)
    }

    /// Pulses counted since the last drain, without resetting
    pub fn pending_pulses(&self) -> u64 {
        self.cells.pulses.load(Ordering::Acquire)
    }

    /// Frames counted since the last drain, without resetting
    pub fn pending_frames(&self) -> u64 {
        self.cells.frames.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_record_pulse() {
        let counters = FrameCounters::new();
        counters.record_pulse(true);
        counters.record_pulse(false);
        counters.record_pulse(true);
        counters.record_frame();

        assert_eq!(counters.pending_pulses(), 3);
        assert_eq!(counters.drain_pulses(), 3);
        assert_eq!(counters.drain_frames(), 3);
        assert_eq!(counters.drain_pulses(), 0);
        assert_eq!(counters.drain_frames(), 0);
    }

    #[test]
    fn test_clones_share_counts() {
        let host = FrameCounters::new();
        let source = host.clone();
        host.record_pulse(true);
        assert_eq!(source.drain_frames(), 1);
        assert_eq!(host.pending_frames(), 0);
    }

    #[test]
    fn test_concurrent_drain_loses_nothing() {
        let counters = FrameCounters::new();
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let c = counters.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        c.record_pulse(true);
                    }
                })
            })
            .collect();

        let mut drained = 0;
        while producers.iter().any(|p| !p.is_finished()) {
            drained += counters.drain_pulses();
        }
        for p in producers {
            p.join().unwrap();
        }
        drained += counters.drain_pulses();

        assert_eq!(drained, 40_000);
        assert_eq!(counters.drain_frames(), 40_000);
    }
}
