//! Monitoring scheduler
//!
//! Drives the cycle runner once (single mode) or at a fixed interval
//! (continuous mode). Cycles never overlap: the next tick is only awaited
//! after the previous cycle has been delivered. Shutdown is checked
//! between cycles, so an in-flight cycle always completes and is delivered.

use super::cycle::CycleRunner;
use super::history::{CycleHistory, DEFAULT_HISTORY_SIZE};
use crate::analysis::AnalysisConfig;
use crate::error::{MonitorError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::CycleResult;
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::report::ReportHandle;
use crate::source::MetricsSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// How the scheduler drives cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run exactly one cycle and stop
    Single,
    /// Run cycles at a fixed interval until shutdown
    #[default]
    Continuous,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Single => write!(f, "single"),
            RunMode::Continuous => write!(f, "continuous"),
        }
    }
}

impl FromStr for RunMode {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "once" => Ok(RunMode::Single),
            "continuous" | "daemon" => Ok(RunMode::Continuous),
            other => Err(MonitorError::Configuration(format!(
                "unknown run mode '{}' (expected single or continuous)",
                other
            ))),
        }
    }
}

/// Lifecycle state of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Scheduler timing configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub mode: RunMode,
    /// Time between cycle starts in continuous mode (default: 300 seconds)
    pub interval: Duration,
    /// Upper bound for one metrics fetch (default: 30 seconds)
    pub fetch_timeout: Duration,
    /// Cycles retained for trend evidence
    pub history_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Continuous,
            interval: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(30),
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(MonitorError::config("interval must be greater than zero"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(MonitorError::config("fetch timeout must be greater than zero"));
        }
        if self.history_size == 0 {
            return Err(MonitorError::config("history size must be at least 1"));
        }
        Ok(())
    }
}

/// Counters accumulated over a scheduler's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles_run: u64,
    /// Cycles whose fetch failed
    pub cycles_failed: u64,
    /// Successful cycles with overall status CRITICAL
    pub critical_cycles: u64,
    /// Cycles that took longer than the interval
    pub overruns: u64,
    /// Reports rejected because the dispatcher queue was full or closed
    pub reports_dropped: u64,
}

/// What a completed `run` produced
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Single(Arc<CycleResult>),
    Continuous(SchedulerStats),
}

/// Drives analysis cycles for one monitored target
pub struct MonitoringScheduler {
    runner: CycleRunner,
    config: SchedulerConfig,
    state_tx: watch::Sender<SchedulerState>,
    history: CycleHistory,
    reports: Option<ReportHandle>,
    health: Option<HealthRegistry>,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
    stats: SchedulerStats,
}

impl MonitoringScheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Shared handle to the cycle history
    pub fn history(&self) -> CycleHistory {
        self.history.clone()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Run according to the configured mode
    pub async fn run(&mut self, shutdown: broadcast::Receiver<()>) -> Result<RunOutcome> {
        match self.config.mode {
            RunMode::Single => self.run_single().await.map(RunOutcome::Single),
            RunMode::Continuous => self.run_continuous(shutdown).await.map(RunOutcome::Continuous),
        }
    }

    /// Execute exactly one cycle, then stop
    pub async fn run_single(&mut self) -> Result<Arc<CycleResult>> {
        self.ensure_not_stopped()?;
        self.mark_started().await;

        let result = self.execute_cycle().await;

        self.mark_stopped("single cycle complete").await;
        Ok(result)
    }

    /// Execute cycles at the configured interval until shutdown is signalled
    ///
    /// A cycle that overruns the interval is followed immediately by the
    /// next one; no cycle is skipped and none runs concurrently.
    pub async fn run_continuous(
        &mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<SchedulerStats> {
        self.ensure_not_stopped()?;
        self.mark_started().await;

        info!(
            interval_secs = self.config.interval.as_secs(),
            fetch_timeout_secs = self.config.fetch_timeout.as_secs(),
            source = %self.runner.source_name(),
            "Starting continuous monitoring"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    let result = self.execute_cycle().await;

                    if result.duration > self.config.interval {
                        self.stats.overruns += 1;
                        self.metrics.inc_cycle_overruns();
                        self.logger.log_overrun(result.duration, self.config.interval);
                    }
                }
            }
        }

        self.mark_stopped("shutdown").await;
        Ok(self.stats.clone())
    }

    fn ensure_not_stopped(&self) -> Result<()> {
        if self.state() == SchedulerState::Stopped {
            return Err(MonitorError::SchedulerStopped);
        }
        Ok(())
    }

    async fn mark_started(&self) {
        if let Some(health) = &self.health {
            health.set_healthy(components::SCHEDULER).await;
        }
        self.logger.log_startup(
            env!("CARGO_PKG_VERSION"),
            &self.config.mode.to_string(),
            self.config.interval,
        );
    }

    async fn mark_stopped(&self, reason: &str) {
        self.state_tx.send_replace(SchedulerState::Stopped);
        if let Some(health) = &self.health {
            health
                .set_unhealthy(components::SCHEDULER, "scheduler stopped")
                .await;
        }
        self.logger.log_shutdown(reason, self.stats.cycles_run);
    }

    /// Run one cycle and deliver its result
    async fn execute_cycle(&mut self) -> Arc<CycleResult> {
        self.state_tx.send_replace(SchedulerState::Running);
        let result = Arc::new(self.runner.run_cycle().await);

        self.stats.cycles_run += 1;
        if result.is_failed() {
            self.stats.cycles_failed += 1;
        } else if result.is_critical() {
            self.stats.critical_cycles += 1;
        }

        self.deliver(result.clone()).await;
        self.state_tx.send_replace(SchedulerState::Idle);
        result
    }

    /// Never waits on the dispatcher; a rejected report is counted and logged
    async fn deliver(&mut self, result: Arc<CycleResult>) {
        if let Some(health) = &self.health {
            match &result.error {
                Some(error) => {
                    health
                        .set_degraded(components::METRICS_SOURCE, error.clone())
                        .await
                }
                None => health.set_healthy(components::METRICS_SOURCE).await,
            }
        }

        if let Some(previous) = self.history.latest().await {
            for resource in &result.health.resources {
                let before = previous.health.resource(&resource.resource).map(|r| r.status);
                if let Some(before) = before.filter(|b| *b != resource.status) {
                    self.logger
                        .log_status_change(&resource.resource, before, resource.status);
                }
            }
        }

        self.history.push(result.clone()).await;
        self.metrics.record_cycle(&result);
        self.logger.log_cycle(&result);

        match &self.reports {
            Some(reports) => {
                if let Err(e) = reports.submit(result) {
                    self.stats.reports_dropped += 1;
                    self.metrics.inc_sink_failures();
                    self.logger.log_sink_failure("dispatcher", &e.to_string());
                    if let Some(health) = &self.health {
                        health
                            .set_degraded(components::REPORT_SINK, e.to_string())
                            .await;
                    }
                }
            }
            None => debug!("No report dispatcher configured"),
        }
    }
}

/// Builder for [`MonitoringScheduler`]
///
/// `build` validates everything and is the only place a
/// `Configuration` error can surface.
pub struct SchedulerBuilder {
    source: Option<Arc<dyn MetricsSource>>,
    analysis: AnalysisConfig,
    config: SchedulerConfig,
    history: Option<CycleHistory>,
    reports: Option<ReportHandle>,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            analysis: AnalysisConfig::default(),
            config: SchedulerConfig::default(),
            history: None,
            reports: None,
            health: None,
            logger: None,
        }
    }

    pub fn source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.config.fetch_timeout = fetch_timeout;
        self
    }

    /// Share an existing history (e.g. with the HTTP API)
    pub fn history(mut self, history: CycleHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn reports(mut self, reports: ReportHandle) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<MonitoringScheduler> {
        self.config.validate()?;
        self.analysis.validate()?;
        let source = self
            .source
            .ok_or_else(|| MonitorError::config("no metrics source configured"))?;

        let runner = CycleRunner::new(source, Arc::new(self.analysis), self.config.fetch_timeout);
        let history = self
            .history
            .unwrap_or_else(|| CycleHistory::new(self.config.history_size));
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        Ok(MonitoringScheduler {
            runner,
            config: self.config,
            state_tx,
            history,
            reports: self.reports,
            health: self.health,
            metrics: MonitorMetrics::new(),
            logger: self.logger.unwrap_or_else(|| StructuredLogger::new("localhost")),
            stats: SchedulerStats::default(),
        })
    }
}
