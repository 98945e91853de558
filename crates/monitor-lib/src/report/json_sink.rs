//! JSON file export
//!
//! Each report is written to `use_report_<YYYYmmdd_HHMMSS>.json` and
//! mirrored to `latest.json` in the same directory.

use super::{CycleReport, ReportSink};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

const LATEST_FILE: &str = "latest.json";

/// Writes pretty-printed JSON reports into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// The directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a report, keyed by cycle start time
    pub fn file_name(report: &CycleReport) -> String {
        format!(
            "use_report_{}.json",
            report.result.started_at.format("%Y%m%d_%H%M%S")
        )
    }

    fn failure(&self, reason: impl std::fmt::Display) -> MonitorError {
        MonitorError::SinkFailure {
            sink: self.name().to_string(),
            reason: format!("{}: {}", self.dir.display(), reason),
        }
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn submit(&self, report: &CycleReport) -> Result<()> {
        let body = serde_json::to_vec_pretty(&report.document()).map_err(|e| self.failure(e))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.failure(e))?;

        let path = self.dir.join(Self::file_name(report));
        tokio::fs::write(&path, &body)
            .await
            .map_err(|e| self.failure(e))?;
        tokio::fs::write(self.dir.join(LATEST_FILE), &body)
            .await
            .map_err(|e| self.failure(e))?;

        debug!(path = %path.display(), bytes = body.len(), "Report written");
        Ok(())
    }

    fn name(&self) -> &str {
        "json_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CycleResult, HealthStatus, SystemHealth};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn report() -> CycleReport {
        CycleReport::new(Arc::new(CycleResult {
            started_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            duration: Duration::from_millis(250),
            health: SystemHealth {
                overall_status: HealthStatus::Warning,
                overall_score: Some(31.5),
                resources: Vec::new(),
            },
            findings: Vec::new(),
            error: None,
        }))
    }

    #[tokio::test]
    async fn test_writes_timestamped_and_latest() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("reports");
        let sink = JsonFileSink::new(&dir);

        sink.submit(&report()).await.unwrap();

        let stamped = dir.join("use_report_20240309_140507.json");
        assert!(stamped.exists());
        let latest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("latest.json")).unwrap())
                .unwrap();
        assert_eq!(latest["status"], "WARNING");
        assert_eq!(latest["result"]["health"]["overall_score"], 31.5);
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_sink_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let sink = JsonFileSink::new(blocker.join("reports"));
        let err = sink.submit(&report()).await.unwrap_err();
        assert!(matches!(err, MonitorError::SinkFailure { ref sink, .. } if sink == "json_file"));
    }
}
