//! Core data models for the USE Method monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A single reading of a named signal
///
/// `value` is `None` when the query failed or returned nothing. Absent
/// values are never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Create a sample; non-finite readings are recorded as absent
    pub fn new(name: impl Into<String>, value: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value: value.filter(|v| v.is_finite()),
            timestamp,
        }
    }

    pub fn present(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Some(value), Utc::now())
    }

    pub fn absent(name: impl Into<String>) -> Self {
        Self::new(name, None, Utc::now())
    }
}

/// Samples for one cycle keyed by signal name
pub type SampleSet = BTreeMap<String, MetricSample>;

/// Health tier of a resource or of the whole system
///
/// Variants are declared in severity order so that `max()` picks the worst:
/// CRITICAL > WARNING > UNKNOWN > HEALTHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Unknown,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Numeric rank used for gauges (0 healthy .. 3 critical)
    pub fn rank(&self) -> i64 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Unknown => 1,
            HealthStatus::Warning => 2,
            HealthStatus::Critical => 3,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Unknown => write!(f, "UNKNOWN"),
            HealthStatus::Warning => write!(f, "WARNING"),
            HealthStatus::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    /// Findings exist only for WARNING and CRITICAL resources
    pub fn from_status(status: HealthStatus) -> Option<Self> {
        match status {
            HealthStatus::Warning => Some(Severity::Warning),
            HealthStatus::Critical => Some(Severity::Critical),
            HealthStatus::Healthy | HealthStatus::Unknown => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A threshold check that fired while scoring a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreach {
    /// Signal the check was evaluated against
    pub signal: String,
    /// Value compared (after normalization by `per`, if any)
    pub value: f64,
    /// Limit that was exceeded
    pub limit: f64,
    pub level: Severity,
}

/// USE sub-scores for one resource
///
/// All scores are 0-100, higher is worse. `None` means unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceScore {
    pub resource: String,
    pub utilization_score: Option<f64>,
    pub saturation_score: Option<f64>,
    pub errors_score: Option<f64>,
    pub overall_score: Option<f64>,
    pub status: HealthStatus,
    /// Raw signal values as sampled, including absent ones
    pub evidence: BTreeMap<String, Option<f64>>,
    /// Threshold checks that fired, critical ones first
    #[serde(default)]
    pub breaches: Vec<ThresholdBreach>,
}

impl ResourceScore {
    /// A score for a resource whose inputs could not be determined
    pub fn unknown(resource: impl Into<String>, evidence: BTreeMap<String, Option<f64>>) -> Self {
        Self {
            resource: resource.into(),
            utilization_score: None,
            saturation_score: None,
            errors_score: None,
            overall_score: None,
            status: HealthStatus::Unknown,
            evidence,
            breaches: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.status == HealthStatus::Unknown
    }
}

/// Aggregate health across all scored resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    /// Mean of known resource scores; `None` when every resource is unknown
    pub overall_score: Option<f64>,
    pub resources: Vec<ResourceScore>,
}

impl SystemHealth {
    pub fn resource(&self, name: &str) -> Option<&ResourceScore> {
        self.resources.iter().find(|r| r.resource == name)
    }
}

/// Structured, rule-based finding for a resource at WARNING or worse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub component: String,
    pub severity: Severity,
    pub title: String,
    pub observation: String,
    /// Copied verbatim from the resource score at scoring time
    pub evidence: BTreeMap<String, Option<f64>>,
    pub root_cause_hint: String,
    pub immediate_action: String,
    pub timestamp: DateTime<Utc>,
}

/// A finding plus additive narrative from an insight enricher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFinding {
    /// Unmodified copy of the rule-based finding
    pub finding: Finding,
    pub narrative: String,
    /// Name of the enricher that produced the narrative
    pub enricher: String,
}

/// Outcome of one fetch-score-aggregate-report pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub health: SystemHealth,
    pub findings: Vec<Finding>,
    /// Set when the cycle failed (metrics source unavailable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleResult {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// A successful cycle whose overall status is CRITICAL
    pub fn is_critical(&self) -> bool {
        !self.is_failed() && self.health.overall_status == HealthStatus::Critical
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            started_at: self.started_at,
            duration_ms: self.duration.as_millis() as u64,
            overall_status: self.health.overall_status,
            overall_score: self.health.overall_score,
            findings: self.findings.len(),
            failed: self.is_failed(),
        }
    }
}

/// Compact view of a cycle for history listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub overall_status: HealthStatus,
    pub overall_score: Option<f64>,
    pub findings: usize,
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_worst_wins() {
        let statuses = [
            HealthStatus::Healthy,
            HealthStatus::Critical,
            HealthStatus::Unknown,
            HealthStatus::Warning,
        ];
        assert_eq!(statuses.iter().max(), Some(&HealthStatus::Critical));
        assert!(HealthStatus::Warning > HealthStatus::Unknown);
        assert!(HealthStatus::Unknown > HealthStatus::Healthy);
    }

    #[test]
    fn test_non_finite_sample_is_absent() {
        let sample = MetricSample::present("swap_used_pct", f64::NAN);
        assert_eq!(sample.value, None);

        let sample = MetricSample::present("load1", 1.5);
        assert_eq!(sample.value, Some(1.5));
    }

    #[test]
    fn test_severity_from_status() {
        assert_eq!(
            Severity::from_status(HealthStatus::Critical),
            Some(Severity::Critical)
        );
        assert_eq!(Severity::from_status(HealthStatus::Unknown), None);
        assert_eq!(Severity::from_status(HealthStatus::Healthy), None);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&HealthStatus::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
    }
}
