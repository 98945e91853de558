//! In-memory metrics source for demos, dry runs and tests

use super::MetricsSource;
use crate::error::{MonitorError, Result};
use crate::models::{MetricSample, SampleSet};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

/// Metrics source returning fixed readings
///
/// Readings can be replaced between cycles with [`StaticSource::set`].
#[derive(Debug, Default)]
pub struct StaticSource {
    readings: RwLock<BTreeMap<String, f64>>,
    unavailable: Option<String>,
}

impl StaticSource {
    pub fn new(readings: BTreeMap<String, f64>) -> Self {
        Self {
            readings: RwLock::new(readings),
            unavailable: None,
        }
    }

    /// Build from `(signal, value)` pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    /// A source whose every fetch fails with `MetricsUnavailable`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            readings: RwLock::default(),
            unavailable: Some(reason.into()),
        }
    }

    /// Replace or add a reading
    pub fn set(&self, signal: &str, value: f64) {
        if let Ok(mut readings) = self.readings.write() {
            readings.insert(signal.to_string(), value);
        }
    }

    /// Remove a reading so it is reported as absent
    pub fn clear(&self, signal: &str) {
        if let Ok(mut readings) = self.readings.write() {
            readings.remove(signal);
        }
    }
}

#[async_trait]
impl MetricsSource for StaticSource {
    async fn fetch(&self, signals: &BTreeSet<String>) -> Result<SampleSet> {
        if let Some(reason) = &self.unavailable {
            return Err(MonitorError::MetricsUnavailable(reason.clone()));
        }

        let readings = self
            .readings
            .read()
            .map_err(|_| MonitorError::MetricsUnavailable("static readings poisoned".into()))?;

        Ok(signals
            .iter()
            .map(|name| {
                let sample = match readings.get(name) {
                    Some(value) => MetricSample::present(name.as_str(), *value),
                    None => MetricSample::absent(name.as_str()),
                };
                (name.clone(), sample)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
