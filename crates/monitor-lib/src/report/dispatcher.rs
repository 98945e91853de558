//! Report dispatcher task
//!
//! The scheduler enqueues finished cycles through a [`ReportHandle`] and
//! moves on. The dispatcher enriches findings, then submits to every sink
//! in order. Dropping every handle drains the queue and ends the task.

use super::{CycleReport, ReportSink};
use crate::enrich::InsightEnricher;
use crate::error::{MonitorError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::CycleResult;
use crate::observability::{MonitorMetrics, StructuredLogger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Dispatcher settings
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Reports queued before `ReportHandle::submit` starts rejecting
    pub queue_size: usize,
    /// Upper bound for one enrichment call
    pub enrich_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_size: 32,
            enrich_timeout: Duration::from_secs(120),
        }
    }
}

/// Counters returned when the dispatcher finishes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub reports: u64,
    pub sink_failures: u64,
    pub enrichment_failures: u64,
}

/// Cloneable sender side of the dispatcher queue
#[derive(Debug, Clone)]
pub struct ReportHandle {
    tx: mpsc::Sender<Arc<CycleResult>>,
}

impl ReportHandle {
    /// Enqueue a finished cycle without waiting
    ///
    /// A full queue rejects the report instead of holding up the caller.
    pub fn submit(&self, result: Arc<CycleResult>) -> Result<()> {
        self.tx.try_send(result).map_err(|e| {
            let reason = match e {
                TrySendError::Full(_) => "report queue is full",
                TrySendError::Closed(_) => "dispatcher task has stopped",
            };
            MonitorError::SinkFailure {
                sink: "dispatcher".to_string(),
                reason: reason.to_string(),
            }
        })
    }
}

/// Fans cycle reports out to sinks
pub struct ReportDispatcher {
    sinks: Vec<Arc<dyn ReportSink>>,
    enricher: Option<Arc<dyn InsightEnricher>>,
    health: Option<HealthRegistry>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
    config: DispatcherConfig,
}

impl ReportDispatcher {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            sinks: Vec::new(),
            enricher: None,
            health: None,
            metrics: MonitorMetrics::new(),
            logger,
            config: DispatcherConfig::default(),
        }
    }

    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn InsightEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the dispatcher task
    ///
    /// The join handle resolves once every `ReportHandle` clone has been
    /// dropped and the queue is empty.
    pub fn spawn(self) -> (ReportHandle, JoinHandle<DispatchStats>) {
        let (tx, rx) = mpsc::channel(self.config.queue_size.max(1));
        let task = tokio::spawn(self.run(rx));
        (ReportHandle { tx }, task)
    }

    async fn run(self, mut rx: mpsc::Receiver<Arc<CycleResult>>) -> DispatchStats {
        info!(
            sinks = self.sinks.len(),
            enricher = self.enricher.as_ref().map(|e| e.name()).unwrap_or("none"),
            "Starting report dispatcher"
        );

        let mut stats = DispatchStats::default();
        while let Some(result) = rx.recv().await {
            self.dispatch(result, &mut stats).await;
        }

        info!(
            reports = stats.reports,
            sink_failures = stats.sink_failures,
            enrichment_failures = stats.enrichment_failures,
            "Report dispatcher drained"
        );
        stats
    }

    /// Enrich and deliver one cycle
    async fn dispatch(&self, result: Arc<CycleResult>, stats: &mut DispatchStats) {
        let mut report = CycleReport::new(result);
        stats.reports += 1;

        if let Some(enricher) = &self.enricher {
            self.enrich(enricher.as_ref(), &mut report, stats).await;
        }

        let mut failed = false;
        for sink in &self.sinks {
            if let Err(e) = sink.submit(&report).await {
                failed = true;
                stats.sink_failures += 1;
                self.metrics.inc_sink_failures();
                self.logger.log_sink_failure(sink.name(), &e.to_string());
                if let Some(health) = &self.health {
                    health
                        .set_degraded(components::REPORT_SINK, format!("{}: {}", sink.name(), e))
                        .await;
                }
            }
        }

        if !failed {
            if let Some(health) = &self.health {
                health.set_healthy(components::REPORT_SINK).await;
            }
        }
    }

    async fn enrich(
        &self,
        enricher: &dyn InsightEnricher,
        report: &mut CycleReport,
        stats: &mut DispatchStats,
    ) {
        let result = report.result.clone();
        let mut last_error = None;

        for finding in &result.findings {
            let outcome = match timeout(self.config.enrich_timeout, enricher.enrich(finding)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(MonitorError::Enrichment(format!(
                    "timed out after {}s",
                    self.config.enrich_timeout.as_secs()
                ))),
            };

            match outcome {
                Ok(insight) => report.insights.push(insight),
                Err(e) => {
                    stats.enrichment_failures += 1;
                    warn!(
                        enricher = %enricher.name(),
                        finding = %finding.id,
                        error = %e,
                        "Enrichment failed; delivering finding without narrative"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        if let Some(health) = &self.health {
            match last_error {
                Some(error) => health.set_degraded(components::ENRICHER, error).await,
                None if !result.findings.is_empty() => {
                    health.set_healthy(components::ENRICHER).await
                }
                None => {}
            }
        }

        debug!(
            findings = result.findings.len(),
            insights = report.insights.len(),
            "Enrichment pass complete"
        );
    }
}
