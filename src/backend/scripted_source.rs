//! Scripted Sample Source for Testing
//!
//! This module provides a deterministic [`SampleSource`] that replays
//! prepared readings, so the sampler can be exercised without touching the
//! operating system or a real host loop.
//!
//! # Behaviour
//!
//! - CPU loads are popped from per-metric queues. A `None` entry simulates a
//!   failed read for that tick. When a queue runs dry the last successful
//!   reading is repeated (or the configured fallback, 0.0 by default).
//! - Pulse and frame counts are popped from their own queues; when those are
//!   empty they are drained from the attached [`FrameCounters`], if any.
//!
//! # Example
//!
//! ```ignore
//! use perfmeter::backend::ScriptedSource;
//!
//! let source = ScriptedSource::new()
//!     .with_process_loads([0.2, 0.4, 0.6])
//!     .with_pulse_counts([6, 6, 6])
//!     .with_core_count(1);
//! ```

use crate::error::{MeterError, Result};
use std::collections::VecDeque;

use super::source_trait::{FrameCounters, SampleSource};

/// One replayable stream of load readings
#[derive(Debug, Clone, Default)]
struct LoadScript {
    queue: VecDeque<Option<f64>>,
    last: Option<f64>,
    fallback: f64,
}

impl LoadScript {
    fn next(&mut self, metric: &'static str) -> Result<f64> {
        match self.queue.pop_front() {
            Some(Some(value)) => {
                self.last = Some(value);
                Ok(value)
            }
            Some(None) => Err(MeterError::read_failure(metric, "scripted failure")),
            None => Ok(self.last.unwrap_or(self.fallback)),
        }
    }
}

/// A deterministic, replaying sample source
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    process: LoadScript,
    system: LoadScript,
    pulses: VecDeque<Option<u64>>,
    frames: VecDeque<Option<u64>>,
    counters: Option<FrameCounters>,
    cores: usize,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    /// Create an empty script on a single core
    pub fn new() -> Self {
        Self {
            process: LoadScript::default(),
            system: LoadScript::default(),
            pulses: VecDeque::new(),
            frames: VecDeque::new(),
            counters: None,
            cores: 1,
        }
    }

    /// Queue process loads, one per tick
    pub fn with_process_loads(mut self, loads: impl IntoIterator<Item = f64>) -> Self {
        self.process.queue.extend(loads.into_iter().map(Some));
        self
    }

    /// Queue process loads where `None` fails that tick's read
    pub fn with_process_readings(mut self, readings: impl IntoIterator<Item = Option<f64>>) -> Self {
        self.process.queue.extend(readings);
        self
    }

    /// Queue system loads, one per tick
    pub fn with_system_loads(mut self, loads: impl IntoIterator<Item = f64>) -> Self {
        self.system.queue.extend(loads.into_iter().map(Some));
        self
    }

    /// Queue system loads where `None` fails that tick's read
    pub fn with_system_readings(mut self, readings: impl IntoIterator<Item = Option<f64>>) -> Self {
        self.system.queue.extend(readings);
        self
    }

    /// Value returned for both loads once their queues are exhausted and nothing was read yet
    pub fn with_fallback_load(mut self, load: f64) -> Self {
        self.process.fallback = load;
        self.system.fallback = load;
        self
    }

    /// Queue pulse counts, one per tick
    pub fn with_pulse_counts(mut self, counts: impl IntoIterator<Item = u64>) -> Self {
        self.pulses.extend(counts.into_iter().map(Some));
        self
    }

    /// Queue frame counts, one per tick
    pub fn with_frame_counts(mut self, counts: impl IntoIterator<Item = u64>) -> Self {
        self.frames.extend(counts.into_iter().map(Some));
        self
    }

    /// Queue a failed pulse read
    pub fn with_failed_pulse_read(mut self) -> Self {
        self.pulses.push_back(None);
        self
    }

    /// Drain counts from live counters once the queues are empty
    pub fn with_counters(mut self, counters: FrameCounters) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Number of cores reported to the sampler
    pub fn with_core_count(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    fn next_count(
        queue: &mut VecDeque<Option<u64>>,
        drain: impl FnOnce() -> u64,
        metric: &'static str,
    ) -> Result<u64> {
        match queue.pop_front() {
            Some(Some(count)) => Ok(count),
            Some(None) => Err(MeterError::read_failure(metric, "scripted failure")),
            None => Ok(drain()),
        }
    }
}

impl SampleSource for ScriptedSource {
    fn process_cpu_load(&mut self) -> Result<f64> {
        self.process.next("process_cpu_load")
    }

    fn system_cpu_load(&mut self) -> Result<f64> {
        self.system.next("system_cpu_load")
    }

    fn core_pulse_count(&mut self) -> Result<u64> {
        let counters = self.counters.as_ref();
        Self::next_count(
            &mut self.pulses,
            || counters.map_or(0, FrameCounters::drain_pulses),
            "pulse_rate",
        )
    }

    fn core_frame_count(&mut self) -> Result<u64> {
        let counters = self.counters.as_ref();
        Self::next_count(
            &mut self.frames,
            || counters.map_or(0, FrameCounters::drain_frames),
            "frame_rate",
        )
    }

    fn core_count(&self) -> usize {
        self.cores
    }
}
