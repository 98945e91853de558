//! API client for a running use-monitor daemon

use anyhow::{Context, Result};
use monitor_lib::{CycleResult, CycleSummary, HealthResponse};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// API client for the daemon's report and health endpoints
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid daemon URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach the monitor daemon")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Latest cycle, `None` before the daemon has completed one
    pub async fn latest_report(&self) -> Result<Option<CycleResult>> {
        let url = self.base_url.join("report/latest").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach the monitor daemon")?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json()
                .await
                .map(Some)
                .context("Failed to parse report"),
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("API error ({}): {}", status, body)
            }
        }
    }

    /// Retained cycle summaries, oldest first
    pub async fn history(&self) -> Result<Vec<CycleSummary>> {
        self.get("report/history").await
    }

    /// Component health of the daemon
    ///
    /// `/healthz` answers 503 with the same body when a component is
    /// unhealthy, so the body is parsed regardless of status.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach the monitor daemon")?;

        match response.status() {
            status if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE => {
                response.json().await.context("Failed to parse health response")
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("API error ({}): {}", status, body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use monitor_lib::{ComponentStatus, HealthStatus, SystemHealth};
    use std::time::Duration;

    fn sample_result() -> CycleResult {
        CycleResult {
            started_at: Utc::now(),
            duration: Duration::from_millis(420),
            health: SystemHealth {
                overall_status: HealthStatus::Warning,
                overall_score: Some(41.5),
                resources: Vec::new(),
            },
            findings: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_latest_report() {
        let mut server = mockito::Server::new_async().await;
        let expected = sample_result();
        let mock = server
            .mock("GET", "/report/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&expected).unwrap())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let report = client.latest_report().await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(report.health.overall_status, HealthStatus::Warning);
        assert_eq!(report.health.overall_score, Some(41.5));
    }

    #[tokio::test]
    async fn test_latest_report_before_first_cycle() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/report/latest")
            .with_status(404)
            .with_body(r#"{"error":"no cycle has completed yet"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();

        assert!(client.latest_report().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history() {
        let mut server = mockito::Server::new_async().await;
        let summaries = vec![sample_result().summary(), sample_result().summary()];
        server
            .mock("GET", "/report/history")
            .with_status(200)
            .with_body(serde_json::to_string(&summaries).unwrap())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let history = client.history().await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].duration_ms, 420);
    }

    #[tokio::test]
    async fn test_health_parses_unhealthy_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_body(
                r#"{"status":"unhealthy","components":{"scheduler":{"status":"unhealthy","message":"scheduler stopped","last_check_timestamp":0}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(health.components.len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/report/history")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.history().await.unwrap_err();

        assert!(err.to_string().contains("500"));
    }
}
