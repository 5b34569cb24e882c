//! Test data builders for creating meters

use perfmeter::{
    FrameCounters, ManualClock, MeterObserver, PerformanceMeter, SamplerConfig, ScriptedSource,
};

/// Builder for creating test meters over a scripted source
pub struct MeterBuilder {
    config: SamplerConfig,
    source: ScriptedSource,
    clock: Option<ManualClock>,
}

impl MeterBuilder {
    pub fn new() -> Self {
        Self {
            config: SamplerConfig::new(40, 1.0),
            source: ScriptedSource::new(),
            clock: None,
        }
    }

    pub fn period_millis(mut self, period_millis: u64) -> Self {
        self.config.period_millis = period_millis;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.smoothing_alpha = alpha;
        self
    }

    pub fn constant_load(mut self, load: f64) -> Self {
        self.source = self.source.with_fallback_load(load);
        self
    }

    pub fn counters(mut self, counters: FrameCounters) -> Self {
        self.source = self.source.with_counters(counters);
        self
    }

    pub fn clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> (PerformanceMeter, MeterObserver) {
        let mut builder = PerformanceMeter::builder()
            .config(self.config)
            .source(self.source);
        if let Some(clock) = self.clock {
            builder = builder.clock(clock);
        }
        builder.build().expect("scripted meter should build")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_builder() {
        let (meter, observer) = MeterBuilder::new().period_millis(250).alpha(0.3).build();

        assert_eq!(meter.period().as_millis(), 250);
        assert_eq!(meter.smoothing_alpha(), 0.3);
        assert!(observer.latest().is_initial());
    }
}
