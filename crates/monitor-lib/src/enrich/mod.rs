//! Insight enrichment
//!
//! An enricher attaches narrative to a copy of a finding. It never feeds
//! back into scoring and the monitor is fully usable without one.

mod chat;

pub use chat::{ChatCompletionEnricher, ChatConfig};

use crate::error::Result;
use crate::models::{EnrichedFinding, Finding};
use async_trait::async_trait;

/// Port to an optional narrative service
#[async_trait]
pub trait InsightEnricher: Send + Sync {
    /// Produce narrative for a finding; the finding itself is copied unchanged
    async fn enrich(&self, finding: &Finding) -> Result<EnrichedFinding>;

    fn name(&self) -> &str;
}
