//! # perfmeter: Background Performance Sampler
//!
//! Measures how often a host application updates and renders, and how much
//! CPU it and the machine use, on a background thread. Every measurement is
//! smoothed with an exponential filter; CPU loads also track running
//! extrema. Results are handed to the host as immutable snapshots without
//! either side ever blocking on the other.
//!
//! ## Architecture
//!
//! - **Analysis**: The exponential smoothing primitive
//! - **Types**: Metric model and published snapshots
//! - **Backend**: Sample sources, the tick state machine and its thread
//! - **Bridge**: One-slot, latest-wins handoff to observers
//! - **Config**: Sampling period and smoothing coefficient, TOML persistence
//!
//! ## Example
//!
//! ```ignore
//! use perfmeter::{FrameCounters, HostSampleSource, PerformanceMeter};
//!
//! fn main() -> perfmeter::Result<()> {
//!     let counters = FrameCounters::new();
//!     let (meter, mut observer) = PerformanceMeter::builder()
//!         .period_millis(100)
//!         .smoothing_alpha(0.01)
//!         .source(HostSampleSource::new(counters.clone()))
//!         .build()?;
//!
//!     meter.start()?;
//!     loop {
//!         let rendered = draw_frame();
//!         counters.record_pulse(rendered);
//!         if observer.poll() {
//!             println!("{}", observer.latest());
//!         }
//!     }
//! }
//! ```

pub mod analysis;
pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use analysis::{alpha_for_time_constant, smooth, ExponentialSmoother};
#[cfg(feature = "host")]
pub use backend::HostSampleSource;
pub use backend::{
    Clock, FrameCounters, ManualClock, PerformanceMeter, PerformanceMeterBuilder, SampleSource,
    Sampler, SamplerLifecycle, ScriptedSource, SystemClock,
};
pub use bridge::{MeterObserver, Publisher};
pub use config::SamplerConfig;
pub use error::{MeterError, Result};
pub use types::{Metric, MetricKind, MetricSet, MetricSnapshot, UNAVAILABLE};
