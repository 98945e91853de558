//! Health aggregation across resources

use crate::models::{HealthStatus, ResourceScore, SystemHealth};

/// Combine resource scores into system health
///
/// Status is the worst resource status. The score is the mean over known
/// resources only; unknown resources still count for the status rollup.
pub fn aggregate(resources: Vec<ResourceScore>) -> SystemHealth {
    let overall_status = resources
        .iter()
        .map(|r| r.status)
        .max()
        .unwrap_or(HealthStatus::Unknown);

    let known: Vec<f64> = resources
        .iter()
        .filter(|r| !r.is_unknown())
        .filter_map(|r| r.overall_score)
        .collect();
    let overall_score = if known.is_empty() {
        None
    } else {
        Some(known.iter().sum::<f64>() / known.len() as f64)
    };

    SystemHealth {
        overall_status,
        overall_score,
        resources,
    }
}
