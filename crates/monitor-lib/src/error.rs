//! Error kinds surfaced by the monitor core
//!
//! Only `Configuration` is fatal. Everything else is scoped to a single
//! cycle (or a single report delivery) and heals on the next tick.

use thiserror::Error;

/// Errors produced by the monitor library
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    /// The metrics source failed the whole fetch (connection error, timeout)
    #[error("metrics unavailable: {0}")]
    MetricsUnavailable(String),

    /// Invalid weights, thresholds, intervals or missing resource definitions
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A report sink rejected a cycle report
    #[error("report sink '{sink}' failed: {reason}")]
    SinkFailure { sink: String, reason: String },

    /// The insight enricher could not produce a narrative
    #[error("insight enrichment failed: {0}")]
    Enrichment(String),

    /// The scheduler already reached its terminal state
    #[error("scheduler is stopped")]
    SchedulerStopped,
}

impl MonitorError {
    /// Returns true for errors that must prevent any cycle from starting
    pub fn is_fatal(&self) -> bool {
        matches!(self, MonitorError::Configuration(_))
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        MonitorError::Configuration(message.into())
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, MonitorError>;
