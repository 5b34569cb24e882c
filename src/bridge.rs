//! Thread boundary between the sampler (background) and its observers.
//!
//! Every observer owns a one-slot channel. The sampler publishes whole
//! [`MetricSnapshot`] values, so an observer never sees a half-updated set.
//! When an observer has not consumed the previous snapshot yet, the stale one
//! is evicted and replaced: observers may skip snapshots, but never see them
//! out of order, and memory stays bounded no matter how slow they are.
//!
//! The observer is polled from whatever thread the caller designates (for a
//! UI, its own event loop), so neither side ever blocks on the other.

use crate::backend::worker::SamplerControls;
use crate::types::MetricSnapshot;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

/// Snapshot slots per observer.
const SLOT_CAPACITY: usize = 1;

struct Slot {
    tx: Sender<MetricSnapshot>,
    /// Weak so a dropped observer's slot can be pruned.
    rx: Weak<Receiver<MetricSnapshot>>,
}

#[derive(Default)]
struct PublisherState {
    slots: Vec<Slot>,
    last: Option<MetricSnapshot>,
}

/// Sampler-side handle that hands snapshots to every observer.
#[derive(Clone, Default)]
pub struct Publisher {
    state: Arc<Mutex<PublisherState>>,
    dropped: Arc<AtomicU64>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("observers", &self.observer_count())
            .field("dropped", &self.dropped_snapshots())
            .finish()
    }
}

impl Publisher {
    /// Create a publisher with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer, seeded with the last published snapshot.
    pub fn subscribe(&self, controls: Arc<SamplerControls>) -> MeterObserver {
        let (tx, rx) = bounded(SLOT_CAPACITY);
        let rx = Arc::new(rx);

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.slots.push(Slot {
            tx,
            rx: Arc::downgrade(&rx),
        });
        let latest = state.last.unwrap_or_default();

        MeterObserver {
            rx,
            latest,
            controls,
        }
    }

    /// Deliver a snapshot to every live observer, replacing unread ones.
    pub fn publish(&self, snapshot: MetricSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last = Some(snapshot);

        let mut dropped = 0u64;
        state.slots.retain(|slot| {
            let Some(rx) = slot.rx.upgrade() else {
                return false;
            };
            let mut pending = snapshot;
            loop {
                match slot.tx.try_send(pending) {
                    Ok(()) => return true,
                    Err(TrySendError::Full(s)) => {
                        if rx.try_recv().is_ok() {
                            dropped += 1;
                        }
                        pending = s;
                    }
                    Err(TrySendError::Disconnected(_)) => return false,
                }
            }
        });

        if dropped > 0 {
            self.dropped.fetch_add(dropped, Ordering::Relaxed);
            tracing::debug!(
                sequence = snapshot.sequence,
                dropped,
                "Replaced unread snapshots"
            );
        }
    }

    /// Snapshots replaced before any observer read them.
    pub fn dropped_snapshots(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .slots
            .iter()
            .filter(|slot| slot.rx.strong_count() > 0)
            .count()
    }

    /// The most recently published snapshot.
    pub fn last(&self) -> Option<MetricSnapshot> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last
    }
}

/// Consumer-side handle: receives snapshots and exposes the latest values.
///
/// Not `Clone`; each observer has its own slot. Create more with
/// [`PerformanceMeter::observer`](crate::backend::PerformanceMeter::observer).
pub struct MeterObserver {
    rx: Arc<Receiver<MetricSnapshot>>,
    latest: MetricSnapshot,
    controls: Arc<SamplerControls>,
}

impl std::fmt::Debug for MeterObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterObserver")
            .field("latest", &self.latest.sequence)
            .finish_non_exhaustive()
    }
}

impl MeterObserver {
    // --- Receiving ---

    /// Take a pending snapshot without blocking. Returns true if one arrived.
    pub fn poll(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(snapshot) => {
                self.latest = snapshot;
                true
            }
            Err(_) => false,
        }
    }

    /// Wait up to `timeout` for the next snapshot.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<MetricSnapshot> {
        match self.rx.recv_timeout(timeout) {
            Ok(snapshot) => {
                self.latest = snapshot;
                Some(snapshot)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// The latest received snapshot (sequence 0 before the first one).
    pub fn latest(&self) -> &MetricSnapshot {
        &self.latest
    }

    // --- Controls ---

    /// Discard smoothing history and extrema on the next tick.
    pub fn reset_averages(&self) {
        self.controls.request_reset();
        tracing::info!("Average reset requested");
    }

    /// Current smoothing coefficient.
    pub fn smoothing_alpha(&self) -> f64 {
        self.controls.alpha()
    }

    /// Change the smoothing coefficient for subsequent ticks.
    pub fn set_smoothing_alpha(&self, alpha: f64) {
        self.controls.set_alpha(alpha);
    }

    // --- Accessors (latest snapshot) ---

    /// Host pulses per second in the latest snapshot.
    pub fn pulse_rate(&self) -> f64 {
        self.latest.pulse_rate()
    }

    /// Smoothed host pulses per second.
    pub fn average_pulse_rate(&self) -> f64 {
        self.latest.average_pulse_rate()
    }

    /// Rendered frames per second in the latest snapshot.
    pub fn frame_rate(&self) -> f64 {
        self.latest.frame_rate()
    }

    /// Smoothed rendered frames per second.
    pub fn average_frame_rate(&self) -> f64 {
        self.latest.average_frame_rate()
    }

    /// Process CPU load in percent (100% per core).
    pub fn process_cpu_load(&self) -> f64 {
        self.latest.process_cpu_load()
    }

    /// Smoothed process CPU load.
    pub fn average_process_cpu_load(&self) -> f64 {
        self.latest.average_process_cpu_load()
    }

    /// Minimum process CPU load since the last reset.
    pub fn min_process_cpu_load(&self) -> f64 {
        self.latest.min_process_cpu_load()
    }

    /// Maximum process CPU load since the last reset.
    pub fn max_process_cpu_load(&self) -> f64 {
        self.latest.max_process_cpu_load()
    }

    /// System CPU load in percent (100% per core).
    pub fn system_cpu_load(&self) -> f64 {
        self.latest.system_cpu_load()
    }

    /// Smoothed system CPU load.
    pub fn average_system_cpu_load(&self) -> f64 {
        self.latest.average_system_cpu_load()
    }

    /// Minimum system CPU load since the last reset.
    pub fn min_system_cpu_load(&self) -> f64 {
        self.latest.min_system_cpu_load()
    }

    /// Maximum system CPU load since the last reset.
    pub fn max_system_cpu_load(&self) -> f64 {
        self.latest.max_system_cpu_load()
    }
}
