//! Backend module for background performance sampling
//!
//! This module runs the sampler on its own thread so the host's update loop
//! is never blocked by measurement work. Snapshots reach the host through
//! the [`bridge`](crate::bridge) module.
//!
//! # Architecture
//!
//! - [`PerformanceMeter`] - Owner of the sampler; start/stop/reset
//! - [`PerformanceMeterBuilder`] - Validated construction
//! - [`MeterObserver`] - Host-side handle returned alongside the meter
//! - [`Sampler`] - The tick state machine, usable without threads
//!
//! # Components
//!
//! - [`SampleSource`] - Raw reading seam (OS, host hooks, scripts)
//! - [`HostSampleSource`] - `sysinfo`-backed source (feature `host`)
//! - [`ScriptedSource`] - Deterministic replaying source
//! - [`FrameCounters`] - Atomic pulse/frame counters the host increments
//! - [`Clock`] - Wall-clock abstraction ([`SystemClock`], [`ManualClock`])
//!
//! # Example
//!
//! ```ignore
//! use perfmeter::backend::{FrameCounters, HostSampleSource, PerformanceMeter};
//!
//! let counters = FrameCounters::new();
//! let (meter, mut observer) = PerformanceMeter::builder()
//!     .period_millis(100)
//!     .source(HostSampleSource::new(counters.clone()))
//!     .build()?;
//!
//! meter.start()?;
//!
//! // In the host's update loop
//! counters.record_pulse(scene_was_dirty);
//! if observer.poll() {
//!     println!("{:.1} fps", observer.average_frame_rate());
//! }
//! ```

pub mod clock;
#[cfg(feature = "host")]
pub mod host_source;
pub mod scripted_source;
pub mod source_trait;
pub mod worker;

pub use clock::{Clock, ManualClock, SystemClock};
#[cfg(feature = "host")]
pub use host_source::HostSampleSource;
pub use scripted_source::ScriptedSource;
pub use source_trait::{FrameCounters, SampleSource};
pub use worker::{event_rate, Sampler, SamplerControls};

use crate::bridge::{MeterObserver, Publisher};
use crate::config::SamplerConfig;
use crate::error::{MeterError, Result};
use crossbeam_channel::{bounded, Sender};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use worker::{SamplerWorker, WorkerParts};

/// Name of the background sampling thread
pub const SAMPLER_THREAD_NAME: &str = "perfmeter-sampler";

/// Body of the sampler thread; `None` if it never received its worker
type WorkerBody = Box<dyn FnOnce() -> Option<WorkerParts> + Send>;

/// Starts the sampler thread
type SpawnFn = fn(WorkerBody) -> io::Result<JoinHandle<Option<WorkerParts>>>;

fn spawn_sampler_thread(body: WorkerBody) -> io::Result<JoinHandle<Option<WorkerParts>>> {
    std::thread::Builder::new()
        .name(SAMPLER_THREAD_NAME.to_string())
        .spawn(body)
}

/// Whether the sampler thread is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerLifecycle {
    Stopped,
    Running,
}

enum MeterState {
    Stopped(WorkerParts),
    Running {
        shutdown_tx: Sender<()>,
        handle: JoinHandle<Option<WorkerParts>>,
    },
    /// The worker thread panicked; its parts are gone.
    Failed,
}

/// Builder for [`PerformanceMeter`]
#[derive(Default)]
pub struct PerformanceMeterBuilder {
    config: SamplerConfig,
    source: Option<Box<dyn SampleSource>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PerformanceMeterBuilder {
    /// Use a complete configuration
    pub fn config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    /// Requested sampling period; clamped to [40, 10000] ms
    pub fn period_millis(mut self, period_millis: u64) -> Self {
        self.config.period_millis = period_millis;
        self
    }

    /// Initial smoothing coefficient
    pub fn smoothing_alpha(mut self, alpha: f64) -> Self {
        self.config.smoothing_alpha = alpha;
        self
    }

    /// The source of raw readings (required)
    pub fn source(mut self, source: impl SampleSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Clock used to measure tick intervals (defaults to [`SystemClock`])
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build the meter and its first observer. The meter starts stopped.
    pub fn build(self) -> Result<(PerformanceMeter, MeterObserver)> {
        let source = self.source.ok_or(MeterError::MissingSource)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        self.config.validate();
        let config = SamplerConfig::new(self.config.period_millis, self.config.smoothing_alpha);

        let controls = Arc::new(SamplerControls::new(config.smoothing_alpha));
        let sampler = Sampler::with_controls(controls.clone(), clock.now_millis());
        let publisher = Publisher::new();
        let observer = publisher.subscribe(controls.clone());

        tracing::debug!(
            period_ms = config.period_millis,
            alpha = config.smoothing_alpha,
            "Performance meter created"
        );

        let meter = PerformanceMeter {
            config,
            controls,
            publisher,
            clock,
            spawn: spawn_sampler_thread,
            state: Mutex::new(MeterState::Stopped(WorkerParts { sampler, source })),
        };
        Ok((meter, observer))
    }
}

/// A background performance sampler
///
/// Dropping the meter stops the sampler thread.
pub struct PerformanceMeter {
    config: SamplerConfig,
    controls: Arc<SamplerControls>,
    publisher: Publisher,
    clock: Arc<dyn Clock>,
    spawn: SpawnFn,
    state: Mutex<MeterState>,
}

impl std::fmt::Debug for PerformanceMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMeter")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

impl PerformanceMeter {
    /// Start building a meter
    pub fn builder() -> PerformanceMeterBuilder {
        PerformanceMeterBuilder::default()
    }

    /// Start the sampler thread. Does nothing if already running.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut parts = match std::mem::replace(&mut *state, MeterState::Failed) {
            MeterState::Stopped(parts) => parts,
            running @ MeterState::Running { .. } => {
                *state = running;
                tracing::debug!("Sampler already running");
                return Ok(());
            }
            MeterState::Failed => {
                return Err(MeterError::WorkerLost);
            }
        };

        parts
            .sampler
            .rearm(self.clock.now_millis(), parts.source.as_mut());

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let worker = SamplerWorker::new(
            parts,
            self.clock.clone(),
            self.publisher.clone(),
            self.period(),
            shutdown_rx,
        );

        // Handed over through a channel so a thread that never starts can
        // give the worker back.
        let (worker_tx, worker_rx) = bounded::<SamplerWorker>(1);
        let thread_rx = worker_rx.clone();
        if let Err(rejected) = worker_tx.try_send(worker) {
            *state = MeterState::Stopped(rejected.into_inner().into_parts());
            return Err(MeterError::WorkerLost);
        }

        let handle = match (self.spawn)(Box::new(move || {
            thread_rx.recv().ok().map(SamplerWorker::run)
        })) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Failed to spawn sampler thread: {}", e);
                if let Ok(worker) = worker_rx.try_recv() {
                    *state = MeterState::Stopped(worker.into_parts());
                }
                return Err(MeterError::Spawn(e));
            }
        };

        *state = MeterState::Running {
            shutdown_tx,
            handle,
        };
        tracing::info!("Performance meter started");
        Ok(())
    }

    /// Stop the sampler thread and wait for an in-flight tick to finish.
    /// Does nothing if already stopped.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match std::mem::replace(&mut *state, MeterState::Failed) {
            MeterState::Running {
                shutdown_tx,
                handle,
            } => {
                let _ = shutdown_tx.try_send(());
                drop(shutdown_tx);
                match handle.join() {
                    Ok(Some(parts)) => {
                        *state = MeterState::Stopped(parts);
                        tracing::info!("Performance meter stopped");
                    }
                    Ok(None) => tracing::error!("Sampler thread exited without its worker"),
                    Err(_) => tracing::error!("Sampler worker panicked"),
                }
            }
            other => *state = other,
        }
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> SamplerLifecycle {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            MeterState::Running { .. } => SamplerLifecycle::Running,
            MeterState::Stopped(_) | MeterState::Failed => SamplerLifecycle::Stopped,
        }
    }

    /// Whether the sampler thread is running
    pub fn is_running(&self) -> bool {
        self.lifecycle() == SamplerLifecycle::Running
    }

    /// Discard smoothing history and extrema on the next tick
    pub fn reset_averages(&self) {
        self.controls.request_reset();
        tracing::info!("Average reset requested");
    }

    /// Current smoothing coefficient
    pub fn smoothing_alpha(&self) -> f64 {
        self.controls.alpha()
    }

    /// Change the smoothing coefficient for subsequent ticks
    pub fn set_smoothing_alpha(&self, alpha: f64) {
        self.controls.set_alpha(alpha);
    }

    /// Effective (clamped) sampling period
    pub fn period(&self) -> Duration {
        self.config.effective_period()
    }

    /// Effective configuration
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Snapshots replaced before an observer read them
    pub fn dropped_snapshots(&self) -> u64 {
        self.publisher.dropped_snapshots()
    }

    /// Create another observer, seeded with the last published snapshot
    pub fn observer(&self) -> MeterObserver {
        self.publisher.subscribe(self.controls.clone())
    }
}

impl Drop for PerformanceMeter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted_meter(period_millis: u64) -> (PerformanceMeter, MeterObserver) {
        PerformanceMeter::builder()
            .period_millis(period_millis)
            .smoothing_alpha(0.5)
            .source(ScriptedSource::new().with_fallback_load(0.25))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_source() {
        let err = PerformanceMeter::builder().build().unwrap_err();
        assert!(matches!(err, MeterError::MissingSource));
    }

    #[test]
    fn test_period_is_clamped() {
        let (meter, _) = scripted_meter(1);
        assert_eq!(meter.period(), Duration::from_millis(40));

        let (meter, _) = scripted_meter(50_000);
        assert_eq!(meter.period(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_starts_stopped() {
        let (meter, observer) = scripted_meter(100);
        assert_eq!(meter.lifecycle(), SamplerLifecycle::Stopped);
        assert!(observer.latest().is_initial());
    }

    #[test]
    fn test_start_stop_idempotent() {
        let (meter, _observer) = scripted_meter(40);

        meter.stop();
        assert!(!meter.is_running());

        meter.start().unwrap();
        meter.start().unwrap();
        assert!(meter.is_running());

        meter.stop();
        meter.stop();
        assert!(!meter.is_running());
    }

    #[test]
    fn test_delivers_snapshots() {
        let (meter, mut observer) = scripted_meter(40);
        meter.start().unwrap();

        let snapshot = observer
            .recv_timeout(Duration::from_secs(5))
            .expect("sampler should publish");
        meter.stop();

        assert!(snapshot.sequence >= 1);
        assert_eq!(snapshot.process_cpu_load(), 25.0);
        assert_eq!(observer.process_cpu_load(), 25.0);
    }

    #[test]
    fn test_failed_spawn_keeps_meter_restartable() {
        let (mut meter, mut observer) = scripted_meter(40);

        meter.start().unwrap();
        observer
            .recv_timeout(Duration::from_secs(5))
            .expect("sampler should publish");
        meter.stop();
        observer.poll();
        let last_sequence = observer.latest().sequence;

        meter.spawn = |_| Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit"));
        let err = meter.start().unwrap_err();
        assert!(matches!(err, MeterError::Spawn(_)));
        assert_eq!(meter.lifecycle(), SamplerLifecycle::Stopped);

        meter.spawn = spawn_sampler_thread;
        meter.start().unwrap();
        let after = observer
            .recv_timeout(Duration::from_secs(5))
            .expect("sampler should publish after a failed spawn");
        meter.stop();

        // The same sampler resumed: sequence and smoothing history carried over.
        assert!(after.sequence > last_sequence);
        assert_eq!(after.average_process_cpu_load(), 25.0);
    }

    #[test]
    fn test_alpha_controls() {
        let (meter, observer) = scripted_meter(100);
        assert_eq!(meter.smoothing_alpha(), 0.5);
        meter.set_smoothing_alpha(0.2);
        assert_eq!(observer.smoothing_alpha(), 0.2);
    }

    #[test]
    fn test_drop_stops_thread() {
        let (meter, mut observer) = scripted_meter(40);
        meter.start().unwrap();
        assert!(observer.recv_timeout(Duration::from_secs(5)).is_some());
        drop(meter);

        // After the worker is joined no further snapshot can arrive.
        observer.poll();
        assert!(observer.recv_timeout(Duration::from_millis(200)).is_none());
    }
}
