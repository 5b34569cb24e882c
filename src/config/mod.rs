//! Configuration module for perfmeter
//!
//! This module handles sampler configuration:
//! - Sampling period, clamped to a bounded operating range
//! - Smoothing coefficient for the exponential filters
//! - TOML persistence in the platform configuration directory
//!
//! # Config Location
//!
//! - **Linux**: `~/.config/perfmeter/perfmeter.toml`
//! - **macOS**: `~/Library/Application Support/perfmeter/perfmeter.toml`
//! - **Windows**: `%APPDATA%\perfmeter\perfmeter.toml`
//!
//! # Example
//!
//! ```ignore
//! use perfmeter::config::SamplerConfig;
//!
//! let config = SamplerConfig::load_or_default();
//! assert!(config.effective_period_millis() >= 40);
//! ```

use crate::error::{MeterError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "perfmeter";

/// Config filename
pub const CONFIG_FILE: &str = "perfmeter.toml";

/// Shortest allowed sampling period in milliseconds
pub const MIN_PERIOD_MILLIS: u64 = 40;

/// Longest allowed sampling period in milliseconds
pub const MAX_PERIOD_MILLIS: u64 = 10_000;

/// Default sampling period in milliseconds
pub const DEFAULT_PERIOD_MILLIS: u64 = 100;

/// Default smoothing coefficient (~10 s time constant at 100 ms sampling)
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.01;

/// Clamp a requested period into the supported range
pub fn clamp_period_millis(requested: u64) -> u64 {
    let clamped = requested.clamp(MIN_PERIOD_MILLIS, MAX_PERIOD_MILLIS);
    if clamped != requested {
        tracing::debug!(
            requested,
            effective = clamped,
            "Sampling period clamped to supported range"
        );
    }
    clamped
}

/// Sampler configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Requested sampling period in milliseconds
    pub period_millis: u64,

    /// IIR coefficient `alpha` in `y(n) = alpha * x(n) + (1 - alpha) * y(n-1)`
    pub smoothing_alpha: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            period_millis: DEFAULT_PERIOD_MILLIS,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
        }
    }
}

impl SamplerConfig {
    /// Create a config; the period is clamped, alpha is taken as given
    pub fn new(period_millis: u64, smoothing_alpha: f64) -> Self {
        Self {
            period_millis: clamp_period_millis(period_millis),
            smoothing_alpha,
        }
    }

    /// The period the sampler will actually use
    pub fn effective_period_millis(&self) -> u64 {
        clamp_period_millis(self.period_millis)
    }

    /// The effective period as a [`Duration`]
    pub fn effective_period(&self) -> Duration {
        Duration::from_millis(self.effective_period_millis())
    }

    /// Check for suspicious values without rejecting them
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.smoothing_alpha.is_finite() {
            warnings.push(format!(
                "smoothing_alpha {} is not finite",
                self.smoothing_alpha
            ));
        } else if self.smoothing_alpha <= 0.0 || self.smoothing_alpha > 1.0 {
            warnings.push(format!(
                "smoothing_alpha {} is outside (0, 1]",
                self.smoothing_alpha
            ));
        }
        if self.period_millis != self.effective_period_millis() {
            warnings.push(format!(
                "period_millis {} will be clamped to {}",
                self.period_millis,
                self.effective_period_millis()
            ));
        }
        for warning in &warnings {
            tracing::warn!("Sampler config: {}", warning);
        }
        warnings
    }

    /// Parse from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(MeterError::from)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Save to a TOML file, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MeterError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }
        let content = self.to_toml_string()?;
        std::fs::write(path, content)?;
        tracing::info!("Saved sampler config to {:?}", path);
        Ok(())
    }

    /// Platform default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to load sampler config: {}", e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.period_millis, 100);
        assert_eq!(config.smoothing_alpha, 0.01);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_period_clamping() {
        assert_eq!(SamplerConfig::new(1, 0.5).period_millis, 40);
        assert_eq!(SamplerConfig::new(50_000, 0.5).period_millis, 10_000);
        assert_eq!(SamplerConfig::new(250, 0.5).period_millis, 250);
        assert_eq!(SamplerConfig::new(40, 0.5).period_millis, 40);
        assert_eq!(SamplerConfig::new(10_000, 0.5).period_millis, 10_000);
    }

    #[test]
    fn test_effective_period_of_unclamped_field() {
        // Deserialized configs bypass `new`, so the clamp applies on use.
        let config = SamplerConfig {
            period_millis: 5,
            smoothing_alpha: 0.1,
        };
        assert_eq!(config.effective_period(), Duration::from_millis(40));
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_alpha_not_clamped() {
        let config = SamplerConfig::new(100, 1.5);
        assert_eq!(config.smoothing_alpha, 1.5);
        assert_eq!(config.validate().len(), 1);

        let config = SamplerConfig::new(100, f64::NAN);
        assert!(config.validate()[0].contains("not finite"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SamplerConfig::from_toml_str("period_millis = 500\n").unwrap();
        assert_eq!(config.period_millis, 500);
        assert_eq!(config.smoothing_alpha, DEFAULT_SMOOTHING_ALPHA);
    }

    #[test]
    fn test_invalid_toml() {
        let err = SamplerConfig::from_toml_str("period_millis = \"fast\"").unwrap_err();
        assert!(matches!(err, MeterError::Serialization(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = SamplerConfig::new(250, 0.2);
        config.save(&path).unwrap();

        let loaded = SamplerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = SamplerConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
