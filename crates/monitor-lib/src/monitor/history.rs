//! Bounded history of recent cycle results
//!
//! A fixed-capacity ring buffer, oldest evicted first. The scheduler is
//! the only writer; the daemon API and trend logging only read.

use crate::models::{CycleResult, CycleSummary, HealthStatus};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of cycles retained
pub const DEFAULT_HISTORY_SIZE: usize = 12;

/// Cloneable handle to the shared cycle history
#[derive(Debug, Clone)]
pub struct CycleHistory {
    entries: Arc<RwLock<VecDeque<Arc<CycleResult>>>>,
    capacity: usize,
}

impl Default for CycleHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl CycleHistory {
    /// Create a history holding at most `capacity` cycles (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a result, evicting the oldest when full
    pub async fn push(&self, result: Arc<CycleResult>) {
        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(result);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn latest(&self) -> Option<Arc<CycleResult>> {
        self.entries.read().await.back().cloned()
    }

    /// Retained results, oldest first
    pub async fn recent(&self) -> Vec<Arc<CycleResult>> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn summaries(&self) -> Vec<CycleSummary> {
        self.entries
            .read()
            .await
            .iter()
            .map(|result| result.summary())
            .collect()
    }

    /// Statuses of one resource across retained cycles, oldest first
    ///
    /// Cycles where the resource was not scored are skipped.
    pub async fn status_trend(&self, resource: &str) -> Vec<HealthStatus> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|result| result.health.resource(resource).map(|r| r.status))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceScore, SystemHealth};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn cycle(cpu: HealthStatus) -> Arc<CycleResult> {
        let mut score = ResourceScore::unknown("cpu", BTreeMap::new());
        score.status = cpu;
        Arc::new(CycleResult {
            started_at: Utc::now(),
            duration: Duration::from_millis(120),
            health: SystemHealth {
                overall_status: cpu,
                overall_score: None,
                resources: vec![score],
            },
            findings: Vec::new(),
            error: None,
        })
    }

    #[tokio::test]
    async fn test_empty_history() {
        let history = CycleHistory::new(3);
        assert!(history.is_empty().await);
        assert!(history.latest().await.is_none());
        assert!(history.summaries().await.is_empty());
    }

    #[tokio::test]
    async fn test_oldest_evicted_first() {
        let history = CycleHistory::new(2);
        history.push(cycle(HealthStatus::Healthy)).await;
        history.push(cycle(HealthStatus::Warning)).await;
        history.push(cycle(HealthStatus::Critical)).await;

        assert_eq!(history.len().await, 2);
        assert_eq!(
            history.status_trend("cpu").await,
            vec![HealthStatus::Warning, HealthStatus::Critical]
        );
        assert_eq!(
            history.latest().await.unwrap().health.overall_status,
            HealthStatus::Critical
        );
    }

    #[tokio::test]
    async fn test_summaries_oldest_first() {
        let history = CycleHistory::default();
        history.push(cycle(HealthStatus::Healthy)).await;
        history.push(cycle(HealthStatus::Warning)).await;

        let summaries = history.summaries().await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].overall_status, HealthStatus::Healthy);
        assert_eq!(summaries[1].duration_ms, 120);
        assert!(!summaries[1].failed);
    }

    #[tokio::test]
    async fn test_clones_share_buffer() {
        let history = CycleHistory::new(4);
        let reader = history.clone();
        history.push(cycle(HealthStatus::Healthy)).await;

        assert_eq!(reader.len().await, 1);
        assert!(reader.status_trend("memory").await.is_empty());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        assert_eq!(CycleHistory::new(0).capacity(), 1);
    }
}
