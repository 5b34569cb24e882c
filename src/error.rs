//! Error handling for perfmeter
//!
//! This module defines the error type and a Result alias used throughout the
//! crate. Only construction, configuration I/O and thread startup surface
//! errors to callers; failures inside a sampling tick are logged and
//! contained by the worker.

use thiserror::Error;

/// Main error type for perfmeter operations
#[derive(Error, Debug)]
pub enum MeterError {
    /// The meter was built without a sample source
    #[error("No sample source configured")]
    MissingSource,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sample source could not produce a reading
    #[error("Sample source error reading {metric}: {message}")]
    Source {
        metric: &'static str,
        message: String,
    },

    /// The background sampling thread could not be spawned
    #[error("Failed to spawn sampler thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The sampler thread panicked; its state cannot be recovered
    #[error("Sampler worker was lost")]
    WorkerLost,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MeterError>,
    },
}

impl MeterError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MeterError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a source read failure
    pub fn read_failure(metric: &'static str, message: impl Into<String>) -> Self {
        MeterError::Source {
            metric,
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for MeterError {
    fn from(err: toml::de::Error) -> Self {
        MeterError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for MeterError {
    fn from(err: toml::ser::Error) -> Self {
        MeterError::Serialization(err.to_string())
    }
}

/// Result type alias for perfmeter operations
pub type Result<T> = std::result::Result<T, MeterError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
