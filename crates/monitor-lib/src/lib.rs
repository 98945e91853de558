//! USE Method monitoring library
//!
//! This crate provides the core functionality for:
//! - Scoring resources along Utilization, Saturation and Errors
//! - Aggregating system health and generating rule-based findings
//! - Running analysis cycles once or on a fixed interval
//! - Metrics sources, report sinks and insight enrichment ports
//! - Health checks and observability for the monitor itself

pub mod analysis;
pub mod enrich;
pub mod error;
pub mod health;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod report;
pub mod source;

pub use analysis::{AnalysisConfig, ResourceScorer};
pub use error::{MonitorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use monitor::{
    CycleHistory, CycleRunner, MonitoringScheduler, RunMode, RunOutcome, SchedulerConfig,
    SchedulerState, SchedulerStats,
};
pub use observability::{MonitorMetrics, StructuredLogger};
pub use report::{CycleReport, ReportDispatcher, ReportHandle, ReportSink};
pub use source::MetricsSource;
