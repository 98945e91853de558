//! Metrics sources
//!
//! A metrics source answers one batched request for a set of named
//! signals. It must return an entry for every requested name (absent when
//! the reading is unavailable) and fail the whole call only when the
//! backend itself cannot be reached.

mod prometheus_source;
mod static_source;

pub use prometheus_source::{
    default_queries, PrometheusConfig, PrometheusSource, SELECTOR_PLACEHOLDER,
};
pub use static_source::StaticSource;

use async_trait::async_trait;
use crate::error::Result;
use crate::models::SampleSet;
use std::collections::BTreeSet;

/// Port to the external metrics backend
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch the latest reading for every requested signal
    async fn fetch(&self, signals: &BTreeSet<String>) -> Result<SampleSet>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
