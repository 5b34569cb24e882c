//! Sampler Worker Thread Implementation
//!
//! This module contains the tick logic and the loop that runs it on a
//! background thread at a fixed rate.
//!
//! # Responsibilities
//!
//! - **Rate derivation**: Drains the pulse/frame counters and divides by the
//!   wall-clock time since the previous tick
//! - **CPU load scaling**: Scales machine-wide loads so one fully loaded core
//!   reads 100%
//! - **Smoothing**: Applies the exponential filter and tracks extrema
//! - **Error containment**: A failed or non-finite reading marks that metric
//!   unavailable for one tick; the loop keeps running
//! - **Publishing**: Hands each completed snapshot to the [`Publisher`]
//!
//! [`Sampler`] is the thread-free part and can be driven directly with any
//! timestamps, which is how the tick semantics are tested.

use crate::backend::clock::Clock;
use crate::backend::source_trait::SampleSource;
use crate::bridge::Publisher;
use crate::error::Result;
use crate::types::{MetricKind, MetricSet, MetricSnapshot};
use crossbeam_channel::{select, Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Settings shared between the sampler thread and its controllers
///
/// Both fields are plain atomics so neither side ever waits on the other.
#[derive(Debug)]
pub struct SamplerControls {
    reset_requested: AtomicBool,
    alpha_bits: AtomicU64,
}

impl SamplerControls {
    /// Create controls with the given smoothing coefficient
    pub fn new(alpha: f64) -> Self {
        Self {
            reset_requested: AtomicBool::new(false),
            alpha_bits: AtomicU64::new(alpha.to_bits()),
        }
    }

    /// Ask the next tick to discard smoothing history and extrema
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
    }

    /// Consume a pending reset request
    pub fn take_reset(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }

    /// Current smoothing coefficient
    pub fn alpha(&self) -> f64 {
        f64::from_bits(self.alpha_bits.load(Ordering::Acquire))
    }

    /// Change the smoothing coefficient for subsequent ticks
    pub fn set_alpha(&self, alpha: f64) {
        self.alpha_bits.store(alpha.to_bits(), Ordering::Release);
    }
}

/// Events per second over `elapsed_secs`, or `None` when no time passed
pub fn event_rate(count: u64, elapsed_secs: f64) -> Option<f64> {
    if elapsed_secs > 0.0 {
        Some(count as f64 / elapsed_secs)
    } else {
        None
    }
}

/// The tick state machine: owns the metric set and the previous tick time
#[derive(Debug)]
pub struct Sampler {
    metrics: MetricSet,
    last_tick_millis: i64,
    sequence: u64,
    controls: Arc<SamplerControls>,
}

impl Sampler {
    /// Create a sampler whose first tick measures time from `now_millis`
    pub fn new(alpha: f64, now_millis: i64) -> Self {
        Self::with_controls(Arc::new(SamplerControls::new(alpha)), now_millis)
    }

    /// Create a sampler driven by existing controls
    pub fn with_controls(controls: Arc<SamplerControls>, now_millis: i64) -> Self {
        Self {
            metrics: MetricSet::new(),
            last_tick_millis: now_millis,
            sequence: 0,
            controls,
        }
    }

    /// Shared controls
    pub fn controls(&self) -> &Arc<SamplerControls> {
        &self.controls
    }

    /// Current metric values
    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// Number of ticks run so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Discard smoothing history on the next tick
    pub fn request_reset(&self) {
        self.controls.request_reset();
    }

    /// Change the smoothing coefficient for subsequent ticks
    pub fn set_smoothing_alpha(&self, alpha: f64) {
        self.controls.set_alpha(alpha);
    }

    /// Prepare for a fresh run: restart the elapsed-time window and discard
    /// events counted while not running
    pub fn rearm(&mut self, now_millis: i64, source: &mut dyn SampleSource) {
        self.last_tick_millis = now_millis;
        let discarded_pulses =
            read_count(source.core_pulse_count(), MetricKind::PulseRate).unwrap_or(0);
        let discarded_frames =
            read_count(source.core_frame_count(), MetricKind::FrameRate).unwrap_or(0);
        if discarded_pulses > 0 || discarded_frames > 0 {
            tracing::debug!(
                discarded_pulses,
                discarded_frames,
                "Discarded events counted while stopped"
            );
        }
    }

    /// Run one tick at `now_millis` and return the resulting snapshot
    pub fn tick(&mut self, now_millis: i64, source: &mut dyn SampleSource) -> MetricSnapshot {
        if self.controls.take_reset() {
            self.metrics.reset_history();
            tracing::info!("Smoothed averages and extrema reset");
        }
        let alpha = self.controls.alpha();

        let elapsed_secs = (now_millis - self.last_tick_millis) as f64 * 1e-3;
        self.last_tick_millis = now_millis;
        if elapsed_secs <= 0.0 {
            tracing::debug!(elapsed_secs, "Non-positive tick interval, rates unavailable");
        }

        // Counters are drained regardless of elapsed time so windows never overlap.
        let pulses = read_count(source.core_pulse_count(), MetricKind::PulseRate);
        let frames = read_count(source.core_frame_count(), MetricKind::FrameRate);

        let cores = source.core_count().max(1) as f64;
        let process = read_load(source.process_cpu_load(), MetricKind::ProcessCpuLoad)
            .map(|load| load * 100.0 * cores);
        let system = read_load(source.system_cpu_load(), MetricKind::SystemCpuLoad)
            .map(|load| load * 100.0 * cores);

        let readings = [
            pulses.and_then(|n| event_rate(n, elapsed_secs)),
            frames.and_then(|n| event_rate(n, elapsed_secs)),
            process,
            system,
        ];

        for (kind, reading) in MetricKind::ALL.into_iter().zip(readings) {
            let metric = self.metrics.get_mut(kind);
            match reading {
                Some(value) => metric.record(value, alpha),
                None => metric.mark_unavailable(),
            }
        }

        self.sequence += 1;
        tracing::trace!(sequence = self.sequence, elapsed_secs, "Sampler tick");

        MetricSnapshot {
            sequence: self.sequence,
            timestamp_millis: now_millis,
            metrics: self.metrics,
        }
    }
}

fn read_count(result: Result<u64>, kind: MetricKind) -> Option<u64> {
    match result {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", kind, e);
            None
        }
    }
}

fn read_load(result: Result<f64>, kind: MetricKind) -> Option<f64> {
    match result {
        Ok(load) if !load.is_finite() => {
            tracing::warn!("Non-finite {} reading: {}", kind, load);
            None
        }
        Ok(load) if load < 0.0 => {
            // Providers report a negative load until they have two samples.
            tracing::debug!("{} not yet available ({})", kind, load);
            None
        }
        Ok(load) => Some(load),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", kind, e);
            None
        }
    }
}

/// Everything the worker thread owns; returned intact when it stops
pub(crate) struct WorkerParts {
    pub sampler: Sampler,
    pub source: Box<dyn SampleSource>,
}

/// The background loop that ticks a [`Sampler`] at a fixed rate
pub(crate) struct SamplerWorker {
    parts: WorkerParts,
    clock: Arc<dyn Clock>,
    publisher: Publisher,
    period: Duration,
    shutdown_rx: Receiver<()>,
}

impl SamplerWorker {
    pub fn new(
        parts: WorkerParts,
        clock: Arc<dyn Clock>,
        publisher: Publisher,
        period: Duration,
        shutdown_rx: Receiver<()>,
    ) -> Self {
        Self {
            parts,
            clock,
            publisher,
            period,
            shutdown_rx,
        }
    }

    /// Give back the sampler and source without running
    pub fn into_parts(self) -> WorkerParts {
        self.parts
    }

    /// Run until the shutdown channel fires or disconnects
    pub fn run(mut self) -> WorkerParts {
        tracing::info!(period_ms = self.period.as_millis() as u64, "Sampler worker started");
        let ticker = crossbeam_channel::tick(self.period);

        loop {
            select! {
                recv(self.shutdown_rx) -> _ => break,
                recv(ticker) -> _ => {
                    // A stop issued while the timer fired wins over the tick.
                    if !matches!(self.shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
                        break;
                    }
                    self.tick();
                }
            }
        }

        tracing::info!(
            ticks = self.parts.sampler.sequence(),
            "Sampler worker stopped"
        );
        self.parts
    }

    fn tick(&mut self) {
        let now = self.clock.now_millis();
        let WorkerParts { sampler, source } = &mut self.parts;
        let snapshot = sampler.tick(now, source.as_mut());
        self.publisher.publish(snapshot);
    }
}
