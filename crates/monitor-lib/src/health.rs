//! Component health tracking for the monitor daemon
//!
//! Tracks the liveness of the daemon's own moving parts (scheduler,
//! metrics source, report sinks, enricher) for `/healthz` and `/readyz`.
//! This is about the monitor itself, not the hosts it monitors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a daemon component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Working, but the last operation failed
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Last known health of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst component status; an empty registry is healthy
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let statuses = components.values().map(|c| c.status);
        if statuses.clone().any(|s| s == ComponentStatus::Unhealthy) {
            ComponentStatus::Unhealthy
        } else if statuses.into_iter().any(|s| s == ComponentStatus::Degraded) {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names
pub mod components {
    pub const SCHEDULER: &str = "scheduler";
    pub const METRICS_SOURCE: &str = "metrics_source";
    pub const REPORT_SINK: &str = "report_sink";
    pub const ENRICHER: &str = "enricher";

    pub const ALL: &[&str] = &[SCHEDULER, METRICS_SOURCE, REPORT_SINK, ENRICHER];
}

/// Shared registry of component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.components.read().await.get(name).cloned()
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once startup has completed and no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let status = self.health().await.status;

        let reason = if !ready {
            Some("Monitor not yet initialized".to_string())
        } else if status == ComponentStatus::Unhealthy {
            Some("Component unhealthy".to_string())
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_register_all_components() {
        let registry = HealthRegistry::new();
        for name in components::ALL {
            registry.register(name).await;
        }

        let health = registry.health().await;
        assert_eq!(health.components.len(), 4);
        assert_eq!(
            health.components[components::METRICS_SOURCE].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_degrades_then_recovers() {
        let registry = HealthRegistry::new();
        registry.register(components::SCHEDULER).await;
        registry.register(components::METRICS_SOURCE).await;

        registry
            .set_degraded(components::METRICS_SOURCE, "connection refused")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
        let source = registry.component(components::METRICS_SOURCE).await.unwrap();
        assert_eq!(source.message.as_deref(), Some("connection refused"));

        registry.set_healthy(components::METRICS_SOURCE).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unhealthy_wins() {
        let registry = HealthRegistry::new();
        registry.set_degraded(components::REPORT_SINK, "disk full").await;
        registry.set_unhealthy(components::SCHEDULER, "stopped").await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
        assert!(!ComponentStatus::Unhealthy.is_operational());
    }

    #[tokio::test]
    async fn test_readiness_lifecycle() {
        let registry = HealthRegistry::new();
        registry.register(components::SCHEDULER).await;
        assert!(!registry.readiness().await.ready);

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::SCHEDULER, "stopped").await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }
}
