//! Report delivery
//!
//! This module provides:
//! - The `ReportSink` port that receives finished cycles
//! - A dispatcher task that enriches findings and fans reports out to sinks
//! - Built-in log and JSON file sinks

mod dispatcher;
mod json_sink;
mod log_sink;

pub use dispatcher::{DispatchStats, DispatcherConfig, ReportDispatcher, ReportHandle};
pub use json_sink::JsonFileSink;
pub use log_sink::LogSink;

use crate::error::Result;
use crate::models::{CycleResult, EnrichedFinding};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// A finished cycle plus any narrative attached by an enricher
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub result: Arc<CycleResult>,
    pub insights: Vec<EnrichedFinding>,
}

impl CycleReport {
    pub fn new(result: Arc<CycleResult>) -> Self {
        Self {
            result,
            insights: Vec::new(),
        }
    }

    /// Serializable form written by file sinks and the CLI
    pub fn document(&self) -> ReportDocument<'_> {
        ReportDocument {
            generated_at: Utc::now(),
            status: self.result.health.overall_status.to_string(),
            result: &self.result,
            insights: &self.insights,
        }
    }
}

/// JSON layout of an exported report
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub status: String,
    pub result: &'a CycleResult,
    pub insights: &'a [EnrichedFinding],
}

/// Port for delivering finished cycles
///
/// Failures are logged and counted by the dispatcher; they never affect
/// the cycle or the scheduler.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, report: &CycleReport) -> Result<()>;

    fn name(&self) -> &str;
}
