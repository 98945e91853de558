//! Sink that writes reports to the tracing log

use super::{CycleReport, ReportSink};
use crate::error::Result;
use crate::observability::StructuredLogger;
use async_trait::async_trait;
use tracing::info;

/// Logs one line per report and one event per finding
#[derive(Clone)]
pub struct LogSink {
    logger: StructuredLogger,
}

impl LogSink {
    pub fn new(logger: StructuredLogger) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl ReportSink for LogSink {
    async fn submit(&self, report: &CycleReport) -> Result<()> {
        let result = &report.result;
        info!(
            event = "report_delivered",
            host = %self.logger.target(),
            started_at = %result.started_at.to_rfc3339(),
            overall_status = %result.health.overall_status,
            findings = result.findings.len(),
            insights = report.insights.len(),
            failed = result.is_failed(),
            "Cycle report"
        );

        for finding in &result.findings {
            self.logger.log_finding(finding);
        }
        for insight in &report.insights {
            info!(
                event = "finding_insight",
                host = %self.logger.target(),
                id = %insight.finding.id,
                enricher = %insight.enricher,
                narrative = %insight.narrative,
                "Finding insight"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CycleResult, HealthStatus, SystemHealth};
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_log_sink_accepts_failed_cycle() {
        let sink = LogSink::new(StructuredLogger::new("web-1"));
        let report = CycleReport::new(Arc::new(CycleResult {
            started_at: Utc::now(),
            duration: Duration::from_millis(3),
            health: SystemHealth {
                overall_status: HealthStatus::Unknown,
                overall_score: None,
                resources: Vec::new(),
            },
            findings: Vec::new(),
            error: Some("metrics unavailable".into()),
        }));

        assert!(sink.submit(&report).await.is_ok());
        assert_eq!(sink.name(), "log");
    }
}
