//! Resource definitions, weights and the severity threshold table
//!
//! Every resource is described by data, not code: which signal drives each
//! USE axis, which signals are required, and the two-tier threshold checks.
//! The scorer is a single lookup over these definitions.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Tolerance when checking that weights sum to 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Default signal names
pub mod signals {
    pub const CPU_UTILIZATION_PCT: &str = "cpu_utilization_pct";
    pub const LOAD1: &str = "load1";
    pub const CPU_COUNT: &str = "cpu_count";
    pub const CPU_STEAL_PCT: &str = "cpu_steal_pct";
    pub const MEMORY_USED_PCT: &str = "memory_used_pct";
    pub const SWAP_USED_PCT: &str = "swap_used_pct";
    pub const OOM_KILLS_PER_SEC: &str = "oom_kills_per_sec";
    pub const DISK_USED_PCT: &str = "disk_used_pct";
    pub const DISK_IO_TIME_PCT: &str = "disk_io_time_pct";
    pub const DISK_IO_ERRORS_PER_SEC: &str = "disk_io_errors_per_sec";
    pub const NETWORK_THROUGHPUT_MBPS: &str = "network_throughput_mbps";
}

/// Default resource names
pub mod resources {
    pub const CPU: &str = "cpu";
    pub const MEMORY: &str = "memory";
    pub const DISK: &str = "disk";
    pub const NETWORK: &str = "network";
}

/// Weights of the three USE axes in a resource's overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub utilization: f64,
    pub saturation: f64,
    pub errors: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            utilization: 1.0 / 3.0,
            saturation: 1.0 / 3.0,
            errors: 1.0 / 3.0,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.utilization, self.saturation, self.errors];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(MonitorError::config(format!(
                "score weights must be finite and non-negative, got {:?}",
                weights
            )));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(MonitorError::config(format!(
                "score weights must sum to 1.0, got {:.6}",
                sum
            )));
        }
        Ok(())
    }
}

fn default_full_scale() -> f64 {
    100.0
}

/// Signal driving one USE axis
///
/// Axis score = clamp(value / per / full_scale * 100, 0, 100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSignal {
    pub signal: String,
    /// Optional normalizing signal (e.g. core count for load average)
    #[serde(default)]
    pub per: Option<String>,
    /// Normalized value that maps to a score of 100
    #[serde(default = "default_full_scale")]
    pub full_scale: f64,
}

impl AxisSignal {
    pub fn percent(signal: &str) -> Self {
        Self {
            signal: signal.to_string(),
            per: None,
            full_scale: default_full_scale(),
        }
    }

    pub fn scaled(signal: &str, full_scale: f64) -> Self {
        Self {
            signal: signal.to_string(),
            per: None,
            full_scale,
        }
    }

    pub fn per(mut self, divisor: &str) -> Self {
        self.per = Some(divisor.to_string());
        self
    }
}

/// One row of the two-tier threshold table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCheck {
    pub signal: String,
    #[serde(default)]
    pub per: Option<String>,
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdCheck {
    pub fn new(signal: &str, warning: f64, critical: f64) -> Self {
        Self {
            signal: signal.to_string(),
            per: None,
            warning,
            critical,
        }
    }

    pub fn per(mut self, divisor: &str) -> Self {
        self.per = Some(divisor.to_string());
        self
    }
}

/// Everything needed to score one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub name: String,
    pub utilization: AxisSignal,
    #[serde(default)]
    pub saturation: Option<AxisSignal>,
    /// Resources without a meaningful error signal leave this unset and
    /// score errors as 0
    #[serde(default)]
    pub errors: Option<AxisSignal>,
    /// Required signals beyond the utilization signal
    #[serde(default)]
    pub required: Vec<String>,
    /// Empty for informational resources
    #[serde(default)]
    pub thresholds: Vec<ThresholdCheck>,
}

impl ResourceDefinition {
    /// Signals whose absence forces UNKNOWN
    pub fn required_signals(&self) -> BTreeSet<&str> {
        std::iter::once(self.utilization.signal.as_str())
            .chain(self.required.iter().map(String::as_str))
            .collect()
    }

    /// Every signal this resource reads, required or optional
    pub fn signals(&self) -> BTreeSet<&str> {
        let mut names = self.required_signals();
        for axis in [Some(&self.utilization), self.saturation.as_ref(), self.errors.as_ref()]
            .into_iter()
            .flatten()
        {
            names.insert(axis.signal.as_str());
            if let Some(per) = &axis.per {
                names.insert(per.as_str());
            }
        }
        for check in &self.thresholds {
            names.insert(check.signal.as_str());
            if let Some(per) = &check.per {
                names.insert(per.as_str());
            }
        }
        names
    }

    pub fn is_informational(&self) -> bool {
        self.thresholds.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::config("resource name must not be empty"));
        }
        for axis in [Some(&self.utilization), self.saturation.as_ref(), self.errors.as_ref()]
            .into_iter()
            .flatten()
        {
            if !axis.full_scale.is_finite() || axis.full_scale <= 0.0 {
                return Err(MonitorError::config(format!(
                    "resource '{}': full_scale for '{}' must be positive",
                    self.name, axis.signal
                )));
            }
        }
        for check in &self.thresholds {
            if !check.warning.is_finite() || !check.critical.is_finite() {
                return Err(MonitorError::config(format!(
                    "resource '{}': thresholds for '{}' must be finite",
                    self.name, check.signal
                )));
            }
            if check.warning > check.critical {
                return Err(MonitorError::config(format!(
                    "resource '{}': warning threshold {} for '{}' exceeds critical {}",
                    self.name, check.warning, check.signal, check.critical
                )));
            }
        }
        Ok(())
    }
}

/// Weights plus resource definitions, passed explicitly to the scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceDefinition>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            resources: default_resources(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if self.resources.is_empty() {
            return Err(MonitorError::config("at least one resource must be defined"));
        }
        let mut seen = HashSet::new();
        for resource in &self.resources {
            resource.validate()?;
            if !seen.insert(resource.name.as_str()) {
                return Err(MonitorError::config(format!(
                    "resource '{}' is defined more than once",
                    resource.name
                )));
            }
        }
        Ok(())
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Union of every signal any resource reads, for a single batched fetch
    pub fn signal_names(&self) -> BTreeSet<String> {
        self.resources
            .iter()
            .flat_map(|r| r.signals())
            .map(str::to_string)
            .collect()
    }

    /// Replace one resource's threshold table
    pub fn override_thresholds(&mut self, resource: &str, checks: Vec<ThresholdCheck>) -> Result<()> {
        let definition = self
            .resources
            .iter_mut()
            .find(|r| r.name == resource)
            .ok_or_else(|| {
                MonitorError::config(format!(
                    "cannot override thresholds: resource '{}' is not defined",
                    resource
                ))
            })?;
        definition.thresholds = checks;
        definition.validate()
    }

    /// Apply a set of overrides keyed by resource name
    pub fn with_threshold_overrides(
        mut self,
        overrides: &BTreeMap<String, Vec<ThresholdCheck>>,
    ) -> Result<Self> {
        for (resource, checks) in overrides {
            self.override_thresholds(resource, checks.clone())?;
        }
        Ok(self)
    }
}

/// CPU, memory, disk and network with the default threshold table
pub fn default_resources() -> Vec<ResourceDefinition> {
    use signals::*;

    vec![
        ResourceDefinition {
            name: resources::CPU.to_string(),
            utilization: AxisSignal::percent(CPU_UTILIZATION_PCT),
            // Load per core of 4 maps to a saturation score of 100
            saturation: Some(AxisSignal::scaled(LOAD1, 4.0).per(CPU_COUNT)),
            // Steal time as the error proxy
            errors: Some(AxisSignal::percent(CPU_STEAL_PCT)),
            required: vec![LOAD1.to_string()],
            thresholds: vec![
                ThresholdCheck::new(CPU_UTILIZATION_PCT, 80.0, 90.0),
                ThresholdCheck::new(LOAD1, 2.0, 4.0).per(CPU_COUNT),
            ],
        },
        ResourceDefinition {
            name: resources::MEMORY.to_string(),
            utilization: AxisSignal::percent(MEMORY_USED_PCT),
            saturation: Some(AxisSignal::percent(SWAP_USED_PCT)),
            errors: Some(AxisSignal::scaled(OOM_KILLS_PER_SEC, 1.0)),
            required: Vec::new(),
            thresholds: vec![
                ThresholdCheck::new(MEMORY_USED_PCT, 85.0, 95.0),
                ThresholdCheck::new(SWAP_USED_PCT, 50.0, 80.0),
            ],
        },
        ResourceDefinition {
            name: resources::DISK.to_string(),
            utilization: AxisSignal::percent(DISK_USED_PCT),
            saturation: Some(AxisSignal::percent(DISK_IO_TIME_PCT)),
            errors: Some(AxisSignal::scaled(DISK_IO_ERRORS_PER_SEC, 1.0)),
            required: Vec::new(),
            thresholds: vec![ThresholdCheck::new(DISK_USED_PCT, 85.0, 95.0)],
        },
        ResourceDefinition {
            name: resources::NETWORK.to_string(),
            // Throughput against a 1 Gbps link
            utilization: AxisSignal::scaled(NETWORK_THROUGHPUT_MBPS, 1000.0),
            saturation: None,
            errors: None,
            required: Vec::new(),
            thresholds: Vec::new(),
        },
    ]
}
