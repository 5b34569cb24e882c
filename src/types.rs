//! Core data types for perfmeter
//!
//! This module contains the metric model shared by the sampler thread and
//! its observers.
//!
//! # Main Types
//!
//! - [`MetricKind`] - The four tracked metrics, in their fixed update order
//! - [`Metric`] - Raw value, smoothed value and (for CPU load) running extrema
//! - [`MetricSet`] - The fixed-shape collection of all four metrics
//! - [`MetricSnapshot`] - An immutable, published copy of a [`MetricSet`]
//!
//! # Sentinels
//!
//! Values that are not available (no sample yet, clock skew, failed read) are
//! `None` on the `Option` accessors of [`Metric`] and [`UNAVAILABLE`] (-1.0)
//! on the plain `f64` accessors.

use crate::analysis::smooth;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel reported for values that are not available
pub const UNAVAILABLE: f64 = -1.0;

/// Identifies one of the tracked metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Host update cycles per second, counted whether or not anything rendered
    PulseRate,
    /// Rendered frames per second
    FrameRate,
    /// CPU load of this process, 100% per fully loaded core
    ProcessCpuLoad,
    /// CPU load of the whole machine, 100% per fully loaded core
    SystemCpuLoad,
}

impl MetricKind {
    /// All metrics in update order
    pub const ALL: [MetricKind; 4] = [
        MetricKind::PulseRate,
        MetricKind::FrameRate,
        MetricKind::ProcessCpuLoad,
        MetricKind::SystemCpuLoad,
    ];

    /// Stable identifier used in logs and serialized output
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::PulseRate => "pulse_rate",
            MetricKind::FrameRate => "frame_rate",
            MetricKind::ProcessCpuLoad => "process_cpu_load",
            MetricKind::SystemCpuLoad => "system_cpu_load",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            MetricKind::PulseRate => "Pulse rate",
            MetricKind::FrameRate => "Frame rate",
            MetricKind::ProcessCpuLoad => "Process CPU",
            MetricKind::SystemCpuLoad => "System CPU",
        }
    }

    /// Unit suffix for display
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::PulseRate | MetricKind::FrameRate => "Hz",
            MetricKind::ProcessCpuLoad | MetricKind::SystemCpuLoad => "%",
        }
    }

    /// Whether running min/max are tracked for this metric
    pub fn tracks_extrema(&self) -> bool {
        matches!(self, MetricKind::ProcessCpuLoad | MetricKind::SystemCpuLoad)
    }

    fn index(self) -> usize {
        match self {
            MetricKind::PulseRate => 0,
            MetricKind::FrameRate => 1,
            MetricKind::ProcessCpuLoad => 2,
            MetricKind::SystemCpuLoad => 3,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single metric with its latest reading and derived statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    kind: MetricKind,
    raw: Option<f64>,
    smoothed: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl Metric {
    /// Create an empty metric
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            raw: None,
            smoothed: None,
            min: None,
            max: None,
        }
    }

    /// Which metric this is
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Latest raw reading, `None` if the last tick had none
    pub fn raw_value(&self) -> Option<f64> {
        self.raw
    }

    /// Smoothed value, `None` before the first reading or after a reset
    pub fn smoothed_value(&self) -> Option<f64> {
        self.smoothed
    }

    /// Smallest reading since the last reset
    pub fn min_value(&self) -> Option<f64> {
        self.min
    }

    /// Largest reading since the last reset
    pub fn max_value(&self) -> Option<f64> {
        self.max
    }

    /// Latest raw reading or [`UNAVAILABLE`]
    pub fn raw(&self) -> f64 {
        self.raw.unwrap_or(UNAVAILABLE)
    }

    /// Smoothed value or [`UNAVAILABLE`]
    pub fn smoothed(&self) -> f64 {
        self.smoothed.unwrap_or(UNAVAILABLE)
    }

    /// Minimum or [`UNAVAILABLE`]
    pub fn min(&self) -> f64 {
        self.min.unwrap_or(UNAVAILABLE)
    }

    /// Maximum or [`UNAVAILABLE`]
    pub fn max(&self) -> f64 {
        self.max.unwrap_or(UNAVAILABLE)
    }

    /// Whether the last tick produced a reading
    pub fn is_available(&self) -> bool {
        self.raw.is_some()
    }

    /// Record a reading: update the raw value, smoothing and extrema
    pub fn record(&mut self, value: f64, alpha: f64) {
        self.raw = Some(value);
        self.smoothed = Some(smooth(self.smoothed, value, alpha));
        if self.kind.tracks_extrema() {
            self.min = Some(self.min.map_or(value, |m| m.min(value)));
            self.max = Some(self.max.map_or(value, |m| m.max(value)));
        }
    }

    /// Mark this tick's reading as unavailable; history is kept
    pub fn mark_unavailable(&mut self) {
        self.raw = None;
    }

    /// Forget smoothed value and extrema, leaving the raw reading alone
    pub fn reset_history(&mut self) {
        self.smoothed = None;
        self.min = None;
        self.max = None;
    }
}

/// The fixed collection of all tracked metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSet {
    metrics: [Metric; 4],
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSet {
    /// Create a set with every metric empty
    pub fn new() -> Self {
        Self {
            metrics: MetricKind::ALL.map(Metric::new),
        }
    }

    /// Get a metric
    pub fn get(&self, kind: MetricKind) -> &Metric {
        &self.metrics[kind.index()]
    }

    /// Get a metric mutably
    pub fn get_mut(&mut self, kind: MetricKind) -> &mut Metric {
        &mut self.metrics[kind.index()]
    }

    /// Iterate in update order
    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    /// Reset smoothing and extrema of every metric
    pub fn reset_history(&mut self) {
        for metric in &mut self.metrics {
            metric.reset_history();
        }
    }
}

/// An immutable copy of the metric set as of one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// Tick number, starting at 1; 0 means nothing has been published yet
    pub sequence: u64,
    /// Wall-clock time of the tick in milliseconds since the Unix epoch
    pub timestamp_millis: i64,
    /// Metric values as of this tick
    pub metrics: MetricSet,
}

impl Default for MetricSnapshot {
    fn default() -> Self {
        Self {
            sequence: 0,
            timestamp_millis: 0,
            metrics: MetricSet::new(),
        }
    }
}

impl MetricSnapshot {
    /// Get a metric
    pub fn metric(&self, kind: MetricKind) -> &Metric {
        self.metrics.get(kind)
    }

    /// Whether this is the placeholder before the first published tick
    pub fn is_initial(&self) -> bool {
        self.sequence == 0
    }

    /// Host pulses per second
    pub fn pulse_rate(&self) -> f64 {
        self.metric(MetricKind::PulseRate).raw()
    }

    /// Smoothed host pulses per second
    pub fn average_pulse_rate(&self) -> f64 {
        self.metric(MetricKind::PulseRate).smoothed()
    }

    /// Rendered frames per second
    pub fn frame_rate(&self) -> f64 {
        self.metric(MetricKind::FrameRate).raw()
    }

    /// Smoothed rendered frames per second
    pub fn average_frame_rate(&self) -> f64 {
        self.metric(MetricKind::FrameRate).smoothed()
    }

    /// Process CPU load in percent (100% per core)
    pub fn process_cpu_load(&self) -> f64 {
        self.metric(MetricKind::ProcessCpuLoad).raw()
    }

    /// Smoothed process CPU load
    pub fn average_process_cpu_load(&self) -> f64 {
        self.metric(MetricKind::ProcessCpuLoad).smoothed()
    }

    /// Minimum process CPU load since the last reset
    pub fn min_process_cpu_load(&self) -> f64 {
        self.metric(MetricKind::ProcessCpuLoad).min()
    }

    /// Maximum process CPU load since the last reset
    pub fn max_process_cpu_load(&self) -> f64 {
        self.metric(MetricKind::ProcessCpuLoad).max()
    }

    /// System CPU load in percent (100% per core)
    pub fn system_cpu_load(&self) -> f64 {
        self.metric(MetricKind::SystemCpuLoad).raw()
    }

    /// Smoothed system CPU load
    pub fn average_system_cpu_load(&self) -> f64 {
        self.metric(MetricKind::SystemCpuLoad).smoothed()
    }

    /// Minimum system CPU load since the last reset
    pub fn min_system_cpu_load(&self) -> f64 {
        self.metric(MetricKind::SystemCpuLoad).min()
    }

    /// Maximum system CPU load since the last reset
    pub fn max_system_cpu_load(&self) -> f64 {
        self.metric(MetricKind::SystemCpuLoad).max()
    }

    /// Serialize as a single JSON line
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::MeterError::Serialization(e.to_string()))
    }
}

impl fmt::Display for MetricSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.sequence)?;
        for metric in self.metrics.iter() {
            let kind = metric.kind();
            write!(
                f,
                " | {}: {:.1}{} (avg {:.1})",
                kind.display_name(),
                metric.raw(),
                kind.unit(),
                metric.smoothed()
            )?;
            if kind.tracks_extrema() {
                write!(f, " [{:.1}..{:.1}]", metric.min(), metric.max())?;
            }
        }
        Ok(())
    }
}
