//! Exponential smoothing (first-order IIR filter)
//!
//! Implements `y(n) = alpha * x(n) + (1 - alpha) * y(n-1)`. The filter is
//! bootstrapped by the first sample: with no history the output equals the
//! input, so the series does not start biased toward zero.
//!
//! A filter constant is typically chosen as `alpha ~ Ts / (Ts + T)` with `Ts`
//! the sampling period and `T` the desired time constant, e.g. `Ts = 100 ms`
//! and `alpha = 0.01` gives `T ~ 10 s`.

use std::time::Duration;

/// Blend `current` into `previous` with weight `alpha`.
///
/// Returns `current` unchanged when there is no previous value. Inputs are
/// not validated; callers filter non-finite readings before smoothing.
#[inline]
pub fn smooth(previous: Option<f64>, current: f64, alpha: f64) -> f64 {
    match previous {
        None => current,
        Some(prev) => (1.0 - alpha) * prev + alpha * current,
    }
}

/// Filter coefficient for a sampling period and a desired time constant.
///
/// Returns 1.0 (pass-through) when both durations are zero.
pub fn alpha_for_time_constant(sampling_period: Duration, time_constant: Duration) -> f64 {
    let ts = sampling_period.as_secs_f64();
    let t = time_constant.as_secs_f64();
    if ts + t <= 0.0 {
        return 1.0;
    }
    ts / (ts + t)
}

/// A stateful wrapper around [`smooth`] that owns its running value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl ExponentialSmoother {
    /// Create a smoother with no history
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Filter coefficient
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Change the filter coefficient; history is kept
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    /// Current smoothed value, `None` before the first sample
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Feed one sample and return the new smoothed value
    pub fn update(&mut self, sample: f64) -> f64 {
        let next = smooth(self.value, sample, self.alpha);
        self.value = Some(next);
        next
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.value = None;
    }
}
