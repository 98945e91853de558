//! Observability infrastructure for the USE monitor
//!
//! Provides:
//! - Prometheus metrics (cycle latency and outcomes, per-resource scores, findings, sink failures)
//! - Structured logging of lifecycle events with tracing

use crate::models::{CycleResult, Finding, HealthStatus, Severity};
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge_vec, Gauge, GaugeVec, Histogram, IntCounter,
    IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Cycle latency buckets (in seconds); cycles are bounded by the fetch timeout
const CYCLE_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    cycle_duration_seconds: Histogram,
    cycles_total: IntCounterVec,
    critical_cycles_total: IntCounter,
    overall_score: Gauge,
    resource_status: IntGaugeVec,
    resource_score: GaugeVec,
    findings_total: IntCounterVec,
    sink_failures_total: IntCounter,
    cycle_overruns_total: IntCounter,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            cycle_duration_seconds: register_histogram!(
                "use_monitor_cycle_duration_seconds",
                "Wall-clock duration of analysis cycles",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),

            cycles_total: register_int_counter_vec!(
                "use_monitor_cycles_total",
                "Analysis cycles run, by outcome",
                &["outcome"]
            )
            .expect("Failed to register cycles_total"),

            critical_cycles_total: register_int_counter!(
                "use_monitor_critical_cycles_total",
                "Successful cycles whose overall status was CRITICAL"
            )
            .expect("Failed to register critical_cycles_total"),

            overall_score: register_gauge!(
                "use_monitor_overall_score",
                "Mean USE score over resources with known status (higher is worse)"
            )
            .expect("Failed to register overall_score"),

            resource_status: register_int_gauge_vec!(
                "use_monitor_resource_status",
                "Resource status (0 healthy, 1 unknown, 2 warning, 3 critical)",
                &["resource"]
            )
            .expect("Failed to register resource_status"),

            resource_score: register_gauge_vec!(
                "use_monitor_resource_score",
                "Per-resource USE sub-scores (0-100, higher is worse)",
                &["resource", "axis"]
            )
            .expect("Failed to register resource_score"),

            findings_total: register_int_counter_vec!(
                "use_monitor_findings_total",
                "Findings emitted, by severity",
                &["severity"]
            )
            .expect("Failed to register findings_total"),

            sink_failures_total: register_int_counter!(
                "use_monitor_sink_failures_total",
                "Report sink submissions that failed"
            )
            .expect("Failed to register sink_failures_total"),

            cycle_overruns_total: register_int_counter!(
                "use_monitor_cycle_overruns_total",
                "Cycles that took longer than the scheduling interval"
            )
            .expect("Failed to register cycle_overruns_total"),
        }
    }
}

/// Handle to the process-wide monitor metrics
///
/// Clones share the same underlying registered metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    /// Record everything observable about a finished cycle
    pub fn record_cycle(&self, result: &CycleResult) {
        let inner = self.inner();
        inner
            .cycle_duration_seconds
            .observe(result.duration.as_secs_f64());

        let outcome = if result.is_failed() { "failed" } else { "ok" };
        inner.cycles_total.with_label_values(&[outcome]).inc();
        if result.is_critical() {
            inner.critical_cycles_total.inc();
        }

        if let Some(score) = result.health.overall_score {
            inner.overall_score.set(score);
        }

        for resource in &result.health.resources {
            inner
                .resource_status
                .with_label_values(&[resource.resource.as_str()])
                .set(resource.status.rank());

            let axes = [
                ("utilization", resource.utilization_score),
                ("saturation", resource.saturation_score),
                ("errors", resource.errors_score),
                ("overall", resource.overall_score),
            ];
            // Unknown axes drop their series rather than repeating the last value
            for (axis, value) in axes {
                let labels = [resource.resource.as_str(), axis];
                match value {
                    Some(value) => inner.resource_score.with_label_values(&labels).set(value),
                    None => {
                        let _ = inner.resource_score.remove_label_values(&labels);
                    }
                }
            }
        }

        for finding in &result.findings {
            let severity = finding.severity.to_string();
            inner
                .findings_total
                .with_label_values(&[severity.as_str()])
                .inc();
        }
    }

    pub fn inc_sink_failures(&self) {
        self.inner().sink_failures_total.inc();
    }

    pub fn inc_cycle_overruns(&self) {
        self.inner().cycle_overruns_total.inc();
    }

    pub fn cycles_total(&self, outcome: &str) -> u64 {
        self.inner().cycles_total.with_label_values(&[outcome]).get()
    }
}

/// Structured logger for monitor lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    target: String,
}

impl StructuredLogger {
    /// `target` labels the monitored host or environment
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn log_startup(&self, version: &str, mode: &str, interval: Duration) {
        info!(
            event = "monitor_started",
            host = %self.target,
            version = %version,
            mode = %mode,
            interval_secs = interval.as_secs(),
            "USE monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str, cycles_run: u64) {
        info!(
            event = "monitor_shutdown",
            host = %self.target,
            reason = %reason,
            cycles_run = cycles_run,
            "USE monitor shutting down"
        );
    }

    /// Log the outcome of a cycle, failed cycles at warn
    pub fn log_cycle(&self, result: &CycleResult) {
        match &result.error {
            Some(error) => {
                warn!(
                    event = "cycle_failed",
                    host = %self.target,
                    duration_ms = result.duration.as_millis() as u64,
                    error = %error,
                    "Analysis cycle failed; health unknown"
                );
            }
            None => {
                info!(
                    event = "cycle_completed",
                    host = %self.target,
                    duration_ms = result.duration.as_millis() as u64,
                    overall_status = %result.health.overall_status,
                    overall_score = ?result.health.overall_score,
                    findings = result.findings.len(),
                    "Analysis cycle completed"
                );
            }
        }
    }

    pub fn log_finding(&self, finding: &Finding) {
        match finding.severity {
            Severity::Critical => {
                warn!(
                    event = "finding_emitted",
                    host = %self.target,
                    id = %finding.id,
                    component = %finding.component,
                    severity = %finding.severity,
                    title = %finding.title,
                    observation = %finding.observation,
                    "Critical finding"
                );
            }
            Severity::Warning => {
                info!(
                    event = "finding_emitted",
                    host = %self.target,
                    id = %finding.id,
                    component = %finding.component,
                    severity = %finding.severity,
                    title = %finding.title,
                    observation = %finding.observation,
                    "Warning finding"
                );
            }
        }
    }

    pub fn log_sink_failure(&self, sink: &str, error: &str) {
        warn!(
            event = "sink_failed",
            host = %self.target,
            sink = %sink,
            error = %error,
            "Report sink rejected cycle result"
        );
    }

    pub fn log_overrun(&self, duration: Duration, interval: Duration) {
        warn!(
            event = "cycle_overrun",
            host = %self.target,
            duration_ms = duration.as_millis() as u64,
            interval_ms = interval.as_millis() as u64,
            "Cycle overran the interval; next cycle starts immediately"
        );
    }

    /// Status transitions of a resource between consecutive cycles
    pub fn log_status_change(&self, resource: &str, from: HealthStatus, to: HealthStatus) {
        info!(
            event = "status_changed",
            host = %self.target,
            resource = %resource,
            from = %from,
            to = %to,
            "Resource status changed"
        );
    }
}
