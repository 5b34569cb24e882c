//! Analysis module for metric signal processing
//!
//! This module provides the scalar filters applied to raw telemetry:
//! - Exponential (first-order IIR) smoothing
//! - Time-constant to filter-coefficient conversion

pub mod smoothing;

pub use smoothing::{alpha_for_time_constant, smooth, ExponentialSmoother};
