//! Finding generation
//!
//! Converts WARNING/CRITICAL resource scores into structured findings.
//! Title, root-cause hint and action come from a static template table.

use super::definitions::resources;
use crate::models::{Finding, ResourceScore, Severity};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

struct FindingTemplate {
    resource: &'static str,
    severity: Severity,
    title: &'static str,
    root_cause_hint: &'static str,
    immediate_action: &'static str,
}

const TEMPLATES: &[FindingTemplate] = &[
    FindingTemplate {
        resource: resources::CPU,
        severity: Severity::Critical,
        title: "CPU saturation critical",
        root_cause_hint: "CPU demand exceeds available cores; runnable threads are queueing behind busy CPUs.",
        immediate_action: "Investigate top CPU consumers; consider scaling or killing runaway processes.",
    },
    FindingTemplate {
        resource: resources::CPU,
        severity: Severity::Warning,
        title: "CPU utilization high",
        root_cause_hint: "Sustained CPU load is approaching capacity; peak traffic or CPU-bound jobs are likely.",
        immediate_action: "Monitor closely; profile CPU-bound processes and plan capacity before peak hours.",
    },
    FindingTemplate {
        resource: resources::MEMORY,
        severity: Severity::Critical,
        title: "Memory exhaustion imminent",
        root_cause_hint: "Available memory is nearly exhausted or the system is swapping heavily; OOM kills are likely.",
        immediate_action: "Add RAM or restart memory-intensive applications; check for OOM kills and leaks.",
    },
    FindingTemplate {
        resource: resources::MEMORY,
        severity: Severity::Warning,
        title: "Memory pressure elevated",
        root_cause_hint: "Memory usage or swap activity is trending towards exhaustion.",
        immediate_action: "Monitor memory trends, look for leaking processes and plan a RAM upgrade.",
    },
    FindingTemplate {
        resource: resources::DISK,
        severity: Severity::Critical,
        title: "Disk nearly full",
        root_cause_hint: "Filesystem capacity is almost exhausted; writes will start failing.",
        immediate_action: "Free up disk space immediately or expand storage.",
    },
    FindingTemplate {
        resource: resources::DISK,
        severity: Severity::Warning,
        title: "Disk usage high",
        root_cause_hint: "Filesystem usage is growing towards capacity.",
        immediate_action: "Plan disk cleanup or storage expansion soon.",
    },
    FindingTemplate {
        resource: resources::NETWORK,
        severity: Severity::Critical,
        title: "Network throughput critical",
        root_cause_hint: "Link bandwidth is close to saturation.",
        immediate_action: "Check link capacity and top talkers; apply traffic shaping or upgrade the link.",
    },
    FindingTemplate {
        resource: resources::NETWORK,
        severity: Severity::Warning,
        title: "Network throughput high",
        root_cause_hint: "Link bandwidth usage is elevated.",
        immediate_action: "Review traffic patterns and plan bandwidth upgrades.",
    },
];

fn template(resource: &str, severity: Severity) -> Option<&'static FindingTemplate> {
    TEMPLATES
        .iter()
        .find(|t| t.resource == resource && t.severity == severity)
}

/// Describe which readings crossed which limits
fn observation(score: &ResourceScore) -> String {
    let breaches: Vec<String> = score
        .breaches
        .iter()
        .map(|b| {
            format!(
                "{} at {:.2} exceeds {} limit {:.2}",
                b.signal, b.value, b.level, b.limit
            )
        })
        .collect();
    let overall = score
        .overall_score
        .map(|s| format!(" (USE score {:.1})", s))
        .unwrap_or_default();

    if breaches.is_empty() {
        format!("{} is {}{}", score.resource, score.status, overall)
    } else {
        format!(
            "{} is {}{}: {}",
            score.resource,
            score.status,
            overall,
            breaches.join("; ")
        )
    }
}

/// Generate one finding per resource at WARNING or CRITICAL
///
/// `at` is the cycle start time; it stamps every finding and seeds ids.
pub fn generate(scores: &[ResourceScore], at: DateTime<Utc>) -> Vec<Finding> {
    let mut seen = HashSet::new();

    scores
        .iter()
        .filter_map(|score| Severity::from_status(score.status).map(|severity| (score, severity)))
        .filter(|(score, _)| seen.insert(score.resource.clone()))
        .map(|(score, severity)| {
            let (title, root_cause_hint, immediate_action) = match template(&score.resource, severity) {
                Some(t) => (
                    t.title.to_string(),
                    t.root_cause_hint.to_string(),
                    t.immediate_action.to_string(),
                ),
                None => (
                    format!("{} {}", score.resource, severity),
                    format!("{} crossed its {} threshold.", score.resource, severity),
                    format!("Inspect {} usage and the processes driving it.", score.resource),
                ),
            };

            Finding {
                id: format!("{}-{}", at.timestamp_millis(), score.resource),
                component: score.resource.clone(),
                severity,
                title,
                observation: observation(score),
                evidence: score.evidence.clone(),
                root_cause_hint,
                immediate_action,
                timestamp: at,
            }
        })
        .collect()
}
