//! Analysis cycle runner
//!
//! One cycle is fetch -> score -> aggregate -> generate findings. The
//! fetch is the only suspension point; everything after it is pure.

use crate::analysis::{aggregate, generate_findings, AnalysisConfig, ResourceScorer};
use crate::error::{MonitorError, Result};
use crate::models::{CycleResult, MetricSample, ResourceScore, SampleSet, SystemHealth};
use crate::source::MetricsSource;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::debug;

/// Runs single analysis cycles against a metrics source
#[derive(Clone)]
pub struct CycleRunner {
    source: Arc<dyn MetricsSource>,
    scorer: ResourceScorer,
    signals: BTreeSet<String>,
    fetch_timeout: Duration,
}

impl CycleRunner {
    /// `config` is expected to be validated already
    pub fn new(
        source: Arc<dyn MetricsSource>,
        config: Arc<AnalysisConfig>,
        fetch_timeout: Duration,
    ) -> Self {
        let signals = config.signal_names();
        Self {
            source,
            scorer: ResourceScorer::new(config),
            signals,
            fetch_timeout,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Signals requested by every fetch
    pub fn signals(&self) -> &BTreeSet<String> {
        &self.signals
    }

    /// Run one cycle; source failures are captured in `CycleResult.error`
    pub async fn run_cycle(&self) -> CycleResult {
        let started_at = Utc::now();
        let start = Instant::now();

        let (health, error) = match self.fetch().await {
            Ok(samples) => (aggregate(self.scorer.score_all(&samples)), None),
            Err(e) => {
                debug!(source = %self.source.name(), error = %e, "Fetch failed, cycle health unknown");
                (self.unknown_health(), Some(e.to_string()))
            }
        };
        let findings = generate_findings(&health.resources, started_at);

        CycleResult {
            started_at,
            duration: start.elapsed(),
            health,
            findings,
            error,
        }
    }

    /// One batched fetch bounded by the fetch timeout
    async fn fetch(&self) -> Result<SampleSet> {
        let mut samples = timeout(self.fetch_timeout, self.source.fetch(&self.signals))
            .await
            .map_err(|_| {
                MonitorError::MetricsUnavailable(format!(
                    "{} fetch timed out after {}s",
                    self.source.name(),
                    self.fetch_timeout.as_secs_f64()
                ))
            })??;

        for name in &self.signals {
            samples
                .entry(name.clone())
                .or_insert_with(|| MetricSample::absent(name.as_str()));
        }
        Ok(samples)
    }

    /// Every defined resource at UNKNOWN with absent evidence
    fn unknown_health(&self) -> SystemHealth {
        let resources: Vec<ResourceScore> = self
            .scorer
            .config()
            .resources
            .iter()
            .map(|definition| {
                let evidence: BTreeMap<String, Option<f64>> = definition
                    .signals()
                    .into_iter()
                    .map(|name| (name.to_string(), None))
                    .collect();
                ResourceScore::unknown(&definition.name, evidence)
            })
            .collect();
        aggregate(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::signals::*;
    use crate::models::{HealthStatus, Severity};
    use crate::source::StaticSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runner(source: Arc<dyn MetricsSource>) -> CycleRunner {
        CycleRunner::new(
            source,
            Arc::new(AnalysisConfig::default()),
            Duration::from_secs(5),
        )
    }

    /// Records how many fetches it served and returns a partial mapping
    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl MetricsSource for CountingSource {
        async fn fetch(&self, _signals: &BTreeSet<String>) -> Result<SampleSet> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut samples = SampleSet::new();
            samples.insert(MEMORY_USED_PCT.into(), MetricSample::present(MEMORY_USED_PCT, 40.0));
            Ok(samples)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct HangingSource;

    #[async_trait]
    impl MetricsSource for HangingSource {
        async fn fetch(&self, _signals: &BTreeSet<String>) -> Result<SampleSet> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(SampleSet::new())
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_end_to_end_cpu_critical() {
        let source = Arc::new(StaticSource::from_pairs([
            (CPU_UTILIZATION_PCT, 92.0),
            (LOAD1, 1.5),
            (MEMORY_USED_PCT, 40.0),
            (DISK_USED_PCT, 50.0),
        ]));
        let result = runner(source).run_cycle().await;

        assert!(!result.is_failed());
        assert!(result.is_critical());
        assert_eq!(result.health.resource("cpu").unwrap().status, HealthStatus::Critical);
        assert_eq!(result.health.resource("memory").unwrap().status, HealthStatus::Healthy);
        assert_eq!(result.health.resource("disk").unwrap().status, HealthStatus::Healthy);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].component, "cpu");
        assert_eq!(result.findings[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_single_batched_fetch_and_missing_filled() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
        });
        let runner = runner(source.clone());
        let result = runner.run_cycle().await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        // Omitted signals are absent, so cpu and disk are unknown
        assert_eq!(result.health.resource("cpu").unwrap().status, HealthStatus::Unknown);
        assert_eq!(result.health.resource("memory").unwrap().status, HealthStatus::Healthy);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_source_yields_failed_unknown_cycle() {
        let source = Arc::new(StaticSource::unavailable("connection refused"));
        let result = runner(source).run_cycle().await;

        assert!(result.is_failed());
        assert!(!result.is_critical());
        assert_eq!(result.health.overall_status, HealthStatus::Unknown);
        assert_eq!(result.health.overall_score, None);
        assert_eq!(result.health.resources.len(), 4);
        assert!(result.findings.is_empty());
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_bounds_cycle() {
        let runner = CycleRunner::new(
            Arc::new(HangingSource),
            Arc::new(AnalysisConfig::default()),
            Duration::from_secs(2),
        );
        let result = runner.run_cycle().await;

        assert!(result.is_failed());
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        assert!(result.duration >= Duration::from_secs(2));
        assert!(result.duration < Duration::from_secs(3));
    }
}
