//! Resource scorer
//!
//! Pure function from a sample set to per-resource USE sub-scores and a
//! status tier. Missing inputs never raise: they become UNKNOWN.

use super::definitions::{AnalysisConfig, AxisSignal, ResourceDefinition, ScoreWeights};
use crate::models::{HealthStatus, ResourceScore, SampleSet, Severity, ThresholdBreach};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Scores resources against a validated [`AnalysisConfig`]
#[derive(Debug, Clone)]
pub struct ResourceScorer {
    config: Arc<AnalysisConfig>,
}

impl ResourceScorer {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Score a resource by name; an undefined resource scores UNKNOWN
    pub fn score(&self, resource: &str, samples: &SampleSet) -> ResourceScore {
        match self.config.resource(resource) {
            Some(definition) => score_resource(definition, &self.config.weights, samples),
            None => {
                debug!(resource = %resource, "No definition for resource, scoring as unknown");
                ResourceScore::unknown(resource, BTreeMap::new())
            }
        }
    }

    /// Score every defined resource, in definition order
    pub fn score_all(&self, samples: &SampleSet) -> Vec<ResourceScore> {
        self.config
            .resources
            .iter()
            .map(|definition| score_resource(definition, &self.config.weights, samples))
            .collect()
    }
}

/// Look up a present value for a signal
fn reading(samples: &SampleSet, signal: &str) -> Option<f64> {
    samples.get(signal).and_then(|s| s.value)
}

/// Value of `signal`, divided by `per` when that reading is present and positive
fn normalized(samples: &SampleSet, signal: &str, per: Option<&str>) -> Option<f64> {
    let value = reading(samples, signal)?;
    match per.and_then(|p| reading(samples, p)) {
        Some(divisor) if divisor > 0.0 => Some(value / divisor),
        _ => Some(value),
    }
}

fn axis_score(samples: &SampleSet, axis: &AxisSignal) -> Option<f64> {
    normalized(samples, &axis.signal, axis.per.as_deref())
        .map(|value| (value / axis.full_scale * 100.0).clamp(0.0, 100.0))
}

/// Score one resource against its definition
pub fn score_resource(
    definition: &ResourceDefinition,
    weights: &ScoreWeights,
    samples: &SampleSet,
) -> ResourceScore {
    let evidence: BTreeMap<String, Option<f64>> = definition
        .signals()
        .into_iter()
        .map(|name| (name.to_string(), reading(samples, name)))
        .collect();

    let missing: Vec<&str> = definition
        .required_signals()
        .into_iter()
        .filter(|name| reading(samples, name).is_none())
        .collect();
    if !missing.is_empty() {
        debug!(
            resource = %definition.name,
            missing = ?missing,
            "Required signals absent, resource status unknown"
        );
        return ResourceScore::unknown(&definition.name, evidence);
    }

    // Utilization is required, so its score is present here
    let utilization = axis_score(samples, &definition.utilization).unwrap_or(0.0);
    // Saturation and errors are optional evidence
    let saturation = definition
        .saturation
        .as_ref()
        .and_then(|axis| axis_score(samples, axis))
        .unwrap_or(0.0);
    let errors = definition
        .errors
        .as_ref()
        .and_then(|axis| axis_score(samples, axis))
        .unwrap_or(0.0);

    let overall = weights.utilization * utilization
        + weights.saturation * saturation
        + weights.errors * errors;

    let breaches = evaluate_thresholds(definition, samples);
    let status = match breaches.first().map(|b| b.level) {
        Some(Severity::Critical) => HealthStatus::Critical,
        Some(Severity::Warning) => HealthStatus::Warning,
        None => HealthStatus::Healthy,
    };

    ResourceScore {
        resource: definition.name.clone(),
        utilization_score: Some(utilization),
        saturation_score: Some(saturation),
        errors_score: Some(errors),
        overall_score: Some(overall),
        status,
        evidence,
        breaches,
    }
}

/// Evaluate the threshold table, critical tier first
///
/// Returns the critical breaches if any check crossed its critical limit,
/// otherwise the warning breaches. Checks on absent signals are skipped.
fn evaluate_thresholds(definition: &ResourceDefinition, samples: &SampleSet) -> Vec<ThresholdBreach> {
    let values: Vec<_> = definition
        .thresholds
        .iter()
        .filter_map(|check| {
            normalized(samples, &check.signal, check.per.as_deref()).map(|value| (check, value))
        })
        .collect();

    let critical: Vec<ThresholdBreach> = values
        .iter()
        .filter(|(check, value)| *value > check.critical)
        .map(|(check, value)| ThresholdBreach {
            signal: check.signal.clone(),
            value: *value,
            limit: check.critical,
            level: Severity::Critical,
        })
        .collect();
    if !critical.is_empty() {
        return critical;
    }

    values
        .iter()
        .filter(|(check, value)| *value > check.warning)
        .map(|(check, value)| ThresholdBreach {
            signal: check.signal.clone(),
            value: *value,
            limit: check.warning,
            level: Severity::Warning,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::definitions::{resources, signals, ThresholdCheck};
    use crate::models::MetricSample;

    fn samples(readings: &[(&str, Option<f64>)]) -> SampleSet {
        readings
            .iter()
            .map(|(name, value)| (name.to_string(), MetricSample::new(*name, *value, chrono::Utc::now())))
            .collect()
    }

    fn scorer() -> ResourceScorer {
        ResourceScorer::new(Arc::new(AnalysisConfig::default()))
    }

    #[test]
    fn test_missing_required_signal_is_unknown() {
        let set = samples(&[(signals::CPU_UTILIZATION_PCT, Some(50.0)), (signals::LOAD1, None)]);
        let score = scorer().score(resources::CPU, &set);

        assert_eq!(score.status, HealthStatus::Unknown);
        assert_eq!(score.utilization_score, None);
        assert_eq!(score.saturation_score, None);
        assert_eq!(score.errors_score, None);
        assert_eq!(score.overall_score, None);
        // Evidence still records what was sampled
        assert_eq!(score.evidence[signals::CPU_UTILIZATION_PCT], Some(50.0));
        assert_eq!(score.evidence[signals::LOAD1], None);
    }

    #[test]
    fn test_signal_missing_from_mapping_is_unknown() {
        let set = samples(&[(signals::LOAD1, Some(0.5))]);
        let score = scorer().score(resources::CPU, &set);
        assert_eq!(score.status, HealthStatus::Unknown);
        assert!(score.overall_score.is_none());
    }

    #[test]
    fn test_critical_checked_before_warning() {
        // util 95 crosses critical, load 1 crosses nothing
        let set = samples(&[
            (signals::CPU_UTILIZATION_PCT, Some(95.0)),
            (signals::LOAD1, Some(1.0)),
        ]);
        let score = scorer().score(resources::CPU, &set);
        assert_eq!(score.status, HealthStatus::Critical);
        assert_eq!(score.breaches.len(), 1);
        assert_eq!(score.breaches[0].signal, signals::CPU_UTILIZATION_PCT);
        assert_eq!(score.breaches[0].limit, 90.0);
    }

    #[test]
    fn test_load_alone_triggers_warning() {
        let set = samples(&[
            (signals::CPU_UTILIZATION_PCT, Some(20.0)),
            (signals::LOAD1, Some(2.5)),
        ]);
        let score = scorer().score(resources::CPU, &set);
        assert_eq!(score.status, HealthStatus::Warning);
    }

    #[test]
    fn test_load_normalized_by_core_count() {
        // 6.0 load on 4 cores is 1.5 per core: below the warning limit
        let set = samples(&[
            (signals::CPU_UTILIZATION_PCT, Some(20.0)),
            (signals::LOAD1, Some(6.0)),
            (signals::CPU_COUNT, Some(4.0)),
        ]);
        let score = scorer().score(resources::CPU, &set);
        assert_eq!(score.status, HealthStatus::Healthy);
        // 1.5 / 4.0 * 100
        assert!((score.saturation_score.unwrap() - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_values_are_not_breaches() {
        let set = samples(&[(signals::DISK_USED_PCT, Some(85.0))]);
        let score = scorer().score(resources::DISK, &set);
        assert_eq!(score.status, HealthStatus::Healthy);

        let set = samples(&[(signals::DISK_USED_PCT, Some(95.0))]);
        let score = scorer().score(resources::DISK, &set);
        assert_eq!(score.status, HealthStatus::Warning);
    }

    #[test]
    fn test_swap_drives_memory_status() {
        let set = samples(&[
            (signals::MEMORY_USED_PCT, Some(40.0)),
            (signals::SWAP_USED_PCT, Some(85.0)),
        ]);
        let score = scorer().score(resources::MEMORY, &set);
        assert_eq!(score.status, HealthStatus::Critical);
    }

    #[test]
    fn test_optional_saturation_absent_scores_zero() {
        let set = samples(&[(signals::MEMORY_USED_PCT, Some(60.0)), (signals::SWAP_USED_PCT, None)]);
        let score = scorer().score(resources::MEMORY, &set);
        assert_eq!(score.status, HealthStatus::Healthy);
        assert_eq!(score.saturation_score, Some(0.0));
        assert_eq!(score.errors_score, Some(0.0));
        assert!((score.overall_score.unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_network_is_informational_with_zero_errors() {
        let set = samples(&[(signals::NETWORK_THROUGHPUT_MBPS, Some(990.0))]);
        let score = scorer().score(resources::NETWORK, &set);
        assert_eq!(score.status, HealthStatus::Healthy);
        assert_eq!(score.errors_score, Some(0.0));
        assert!((score.utilization_score.unwrap() - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_scores_are_clamped() {
        let set = samples(&[
            (signals::DISK_USED_PCT, Some(50.0)),
            (signals::DISK_IO_ERRORS_PER_SEC, Some(12.0)),
        ]);
        let score = scorer().score(resources::DISK, &set);
        assert_eq!(score.errors_score, Some(100.0));
    }

    #[test]
    fn test_weighted_overall_score() {
        let config = AnalysisConfig {
            weights: ScoreWeights {
                utilization: 0.5,
                saturation: 0.5,
                errors: 0.0,
            },
            ..AnalysisConfig::default()
        };
        let scorer = ResourceScorer::new(Arc::new(config));
        let set = samples(&[
            (signals::MEMORY_USED_PCT, Some(60.0)),
            (signals::SWAP_USED_PCT, Some(20.0)),
            (signals::OOM_KILLS_PER_SEC, Some(1.0)),
        ]);
        let score = scorer.score(resources::MEMORY, &set);
        assert!((score.overall_score.unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let set = samples(&[
            (signals::CPU_UTILIZATION_PCT, Some(83.3)),
            (signals::LOAD1, Some(2.7)),
            (signals::CPU_COUNT, Some(1.0)),
            (signals::CPU_STEAL_PCT, Some(0.4)),
        ]);
        let scorer = scorer();
        let first = scorer.score(resources::CPU, &set);
        let second = scorer.score(resources::CPU, &set);
        assert_eq!(first, second);
        assert_eq!(
            first.overall_score.map(f64::to_bits),
            second.overall_score.map(f64::to_bits)
        );
    }

    #[test]
    fn test_status_is_monotonic_in_utilization() {
        let scorer = scorer();
        let mut previous = HealthStatus::Healthy;
        for util in (0..=100).map(f64::from) {
            let set = samples(&[(signals::DISK_USED_PCT, Some(util))]);
            let status = scorer.score(resources::DISK, &set).status;
            assert!(status >= previous, "status regressed at {}", util);
            previous = status;
        }
        assert_eq!(previous, HealthStatus::Critical);
    }

    #[test]
    fn test_undefined_resource_is_unknown() {
        let score = scorer().score("gpu", &SampleSet::new());
        assert_eq!(score.status, HealthStatus::Unknown);
        assert_eq!(score.resource, "gpu");
    }

    #[test]
    fn test_custom_threshold_table() {
        let mut config = AnalysisConfig::default();
        config
            .override_thresholds(
                resources::NETWORK,
                vec![ThresholdCheck::new(signals::NETWORK_THROUGHPUT_MBPS, 500.0, 900.0)],
            )
            .unwrap();
        let scorer = ResourceScorer::new(Arc::new(config));
        let set = samples(&[(signals::NETWORK_THROUGHPUT_MBPS, Some(600.0))]);
        assert_eq!(scorer.score(resources::NETWORK, &set).status, HealthStatus::Warning);
    }
}
