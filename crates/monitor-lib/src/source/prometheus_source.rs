//! Prometheus HTTP API metrics source
//!
//! Issues one instant query (`/api/v1/query`) per signal, all in flight
//! at once, against node_exporter-style series.

use super::MetricsSource;
use crate::analysis::signals::*;
use crate::error::{MonitorError, Result};
use crate::models::{MetricSample, SampleSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

/// Placeholder replaced by the configured label matchers in every query
pub const SELECTOR_PLACEHOLDER: &str = "$selector";

/// Configuration for the Prometheus source
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Prometheus base URL (e.g. "http://localhost:9090")
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Label matchers injected into every query, e.g. `instance="web-1:9100"`
    pub selector: String,
    /// PromQL expression per signal name
    pub queries: BTreeMap<String, String>,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            timeout: Duration::from_secs(30),
            selector: String::new(),
            queries: default_queries(),
        }
    }
}

/// PromQL for the default signal catalogue
pub fn default_queries() -> BTreeMap<String, String> {
    let queries = [
        (
            CPU_UTILIZATION_PCT,
            r#"100 - (avg(irate(node_cpu_seconds_total{mode="idle",$selector}[5m])) * 100)"#,
        ),
        (LOAD1, r#"avg(node_load1{$selector})"#),
        (
            CPU_COUNT,
            r#"count(node_cpu_seconds_total{mode="idle",$selector})"#,
        ),
        (
            CPU_STEAL_PCT,
            r#"avg(irate(node_cpu_seconds_total{mode="steal",$selector}[5m])) * 100"#,
        ),
        (
            MEMORY_USED_PCT,
            r#"(1 - (sum(node_memory_MemAvailable_bytes{$selector}) / sum(node_memory_MemTotal_bytes{$selector}))) * 100"#,
        ),
        (
            SWAP_USED_PCT,
            r#"(1 - (sum(node_memory_SwapFree_bytes{$selector}) / sum(node_memory_SwapTotal_bytes{$selector}))) * 100"#,
        ),
        (
            OOM_KILLS_PER_SEC,
            r#"sum(rate(node_vmstat_oom_kill{$selector}[5m]))"#,
        ),
        (
            DISK_USED_PCT,
            r#"max(1 - (node_filesystem_avail_bytes{fstype!~"tmpfs|overlay",$selector} / node_filesystem_size_bytes{fstype!~"tmpfs|overlay",$selector})) * 100"#,
        ),
        (
            DISK_IO_TIME_PCT,
            r#"max(irate(node_disk_io_time_seconds_total{$selector}[5m])) * 100"#,
        ),
        (
            DISK_IO_ERRORS_PER_SEC,
            r#"sum(rate(node_disk_read_errors_total{$selector}[5m]) + rate(node_disk_write_errors_total{$selector}[5m]))"#,
        ),
        (
            NETWORK_THROUGHPUT_MBPS,
            r#"sum(rate(node_network_receive_bytes_total{device!="lo",$selector}[5m]) + rate(node_network_transmit_bytes_total{device!="lo",$selector}[5m])) * 8 / 1000000"#,
        ),
    ];

    queries
        .into_iter()
        .map(|(name, query)| (name.to_string(), query.to_string()))
        .collect()
}

/// Instant query response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    value: (f64, String),
}

/// Outcome of a single query
enum QueryOutcome {
    Value(Option<f64>, DateTime<Utc>),
    /// The server answered but rejected the query
    Rejected,
}

/// Metrics source backed by the Prometheus HTTP API
pub struct PrometheusSource {
    client: Client,
    query_url: Url,
    config: PrometheusConfig,
}

impl PrometheusSource {
    /// Create a new source; invalid URLs are configuration errors
    pub fn new(config: PrometheusConfig) -> Result<Self> {
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let query_url = Url::parse(&base)
            .and_then(|url| url.join("api/v1/query"))
            .map_err(|e| {
                MonitorError::Configuration(format!(
                    "invalid Prometheus URL '{}': {}",
                    config.base_url, e
                ))
            })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MonitorError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            query_url,
            config,
        })
    }

    /// Create a source with default queries for the given URL
    pub fn with_defaults(base_url: impl Into<String>) -> Result<Self> {
        Self::new(PrometheusConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }

    /// PromQL for a signal with the selector substituted
    pub fn render_query(&self, signal: &str) -> Option<String> {
        self.config
            .queries
            .get(signal)
            .map(|q| q.replace(SELECTOR_PLACEHOLDER, &self.config.selector))
    }
}

/// Run one instant query
///
/// Transport failures are returned as `Err` and fail the whole fetch.
async fn run_query(
    client: Client,
    url: Url,
    signal: String,
    query: String,
) -> std::result::Result<(String, QueryOutcome), String> {
    let response = client
        .get(url)
        .query(&[("query", query.as_str())])
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    let body: QueryResponse = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            warn!(signal = %signal, status = %status, error = %e, "Unreadable Prometheus response");
            return Ok((signal, QueryOutcome::Rejected));
        }
    };

    if !status.is_success() || body.status != "success" {
        warn!(
            signal = %signal,
            status = %status,
            error = body.error.as_deref().unwrap_or("unknown"),
            "Prometheus rejected query"
        );
        return Ok((signal, QueryOutcome::Rejected));
    }

    let outcome = match body.data {
        Some(data) => parse_result(&data),
        None => None,
    };
    match outcome {
        Some((value, timestamp)) => Ok((signal, QueryOutcome::Value(value, timestamp))),
        None => {
            debug!(signal = %signal, "Query returned no data");
            Ok((signal, QueryOutcome::Value(None, Utc::now())))
        }
    }
}

/// Extract the first value of a vector or scalar result
fn parse_result(data: &QueryData) -> Option<(Option<f64>, DateTime<Utc>)> {
    let (timestamp, raw) = match data.result_type.as_str() {
        "vector" => {
            let samples: Vec<VectorSample> = serde_json::from_value(data.result.clone()).ok()?;
            samples.into_iter().next()?.value
        }
        "scalar" => serde_json::from_value::<(f64, String)>(data.result.clone()).ok()?,
        _ => return None,
    };

    let at = DateTime::from_timestamp(timestamp.trunc() as i64, (timestamp.fract() * 1e9) as u32)
        .unwrap_or_else(Utc::now);
    Some((raw.parse::<f64>().ok(), at))
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn fetch(&self, signals: &BTreeSet<String>) -> Result<SampleSet> {
        let mut samples = SampleSet::new();
        let mut queries = JoinSet::new();

        for signal in signals {
            match self.render_query(signal) {
                Some(query) => {
                    queries.spawn(run_query(
                        self.client.clone(),
                        self.query_url.clone(),
                        signal.clone(),
                        query,
                    ));
                }
                None => {
                    warn!(signal = %signal, "No query configured for signal");
                    samples.insert(signal.clone(), MetricSample::absent(signal.as_str()));
                }
            }
        }

        let issued = queries.len();
        let mut rejected = 0usize;

        while let Some(joined) = queries.join_next().await {
            match joined {
                Ok(Ok((signal, QueryOutcome::Value(value, at)))) => {
                    samples.insert(signal.clone(), MetricSample::new(signal, value, at));
                }
                Ok(Ok((signal, QueryOutcome::Rejected))) => {
                    rejected += 1;
                    samples.insert(signal.clone(), MetricSample::absent(signal));
                }
                Ok(Err(e)) => {
                    queries.abort_all();
                    return Err(MonitorError::MetricsUnavailable(format!(
                        "{}: {}",
                        self.config.base_url, e
                    )));
                }
                Err(e) => {
                    queries.abort_all();
                    return Err(MonitorError::MetricsUnavailable(format!(
                        "query task failed: {}",
                        e
                    )));
                }
            }
        }

        if issued > 0 && rejected == issued {
            return Err(MonitorError::MetricsUnavailable(format!(
                "{}: all {} queries rejected",
                self.config.base_url, issued
            )));
        }

        Ok(samples)
    }

    fn name(&self) -> &str {
        "prometheus"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn vector_body(value: &str) -> String {
        format!(
            r#"{{"status":"success","data":{{"resultType":"vector","result":[{{"metric":{{"instance":"web-1:9100"}},"value":[1700000000.5,"{}"]}}]}}}}"#,
            value
        )
    }

    const EMPTY_BODY: &str = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;

    fn source_for(server: &Server, queries: &[(&str, &str)]) -> PrometheusSource {
        PrometheusSource::new(PrometheusConfig {
            base_url: server.url(),
            timeout: Duration::from_secs(5),
            selector: String::new(),
            queries: queries
                .iter()
                .map(|(s, q)| (s.to_string(), q.to_string()))
                .collect(),
        })
        .unwrap()
    }

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fetch_parses_vector_results() {
        let mut server = Server::new_async().await;
        let load = server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), "node_load1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(vector_body("1.5"))
            .create_async()
            .await;
        let util = server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), "cpu_busy".into()))
            .with_status(200)
            .with_body(vector_body("92"))
            .create_async()
            .await;

        let source = source_for(&server, &[(LOAD1, "node_load1"), (CPU_UTILIZATION_PCT, "cpu_busy")]);
        let samples = source
            .fetch(&names(&[LOAD1, CPU_UTILIZATION_PCT]))
            .await
            .unwrap();

        assert_eq!(samples[LOAD1].value, Some(1.5));
        assert_eq!(samples[CPU_UTILIZATION_PCT].value, Some(92.0));
        assert_eq!(samples[LOAD1].timestamp.timestamp(), 1_700_000_000);
        load.assert_async().await;
        util.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_and_nan_results_are_absent() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), "swap".into()))
            .with_status(200)
            .with_body(vector_body("NaN"))
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), "oom".into()))
            .with_status(200)
            .with_body(EMPTY_BODY)
            .create_async()
            .await;

        let source = source_for(&server, &[(SWAP_USED_PCT, "swap"), (OOM_KILLS_PER_SEC, "oom")]);
        let samples = source
            .fetch(&names(&[SWAP_USED_PCT, OOM_KILLS_PER_SEC, "unmapped_signal"]))
            .await
            .unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[SWAP_USED_PCT].value, None);
        assert_eq!(samples[OOM_KILLS_PER_SEC].value, None);
        assert_eq!(samples["unmapped_signal"].value, None);
    }

    #[tokio::test]
    async fn test_rejected_query_is_partial_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), "bad(".into()))
            .with_status(400)
            .with_body(r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded("query".into(), "node_load1".into()))
            .with_status(200)
            .with_body(vector_body("0.7"))
            .create_async()
            .await;

        let source = source_for(&server, &[(CPU_UTILIZATION_PCT, "bad("), (LOAD1, "node_load1")]);
        let samples = source
            .fetch(&names(&[CPU_UTILIZATION_PCT, LOAD1]))
            .await
            .unwrap();

        assert_eq!(samples[CPU_UTILIZATION_PCT].value, None);
        assert_eq!(samples[LOAD1].value, Some(0.7));
    }

    #[tokio::test]
    async fn test_all_queries_rejected_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let source = source_for(&server, &[(LOAD1, "node_load1")]);
        let result = source.fetch(&names(&[LOAD1])).await;
        assert!(matches!(result, Err(MonitorError::MetricsUnavailable(_))));
    }

    #[tokio::test]
    async fn test_connection_failure_is_unavailable() {
        let source = PrometheusSource::new(PrometheusConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        let result = source.fetch(&names(&[LOAD1, CPU_UTILIZATION_PCT])).await;
        assert!(matches!(result, Err(MonitorError::MetricsUnavailable(_))));
    }

    #[test]
    fn test_selector_substitution() {
        let source = PrometheusSource::new(PrometheusConfig {
            selector: r#"instance="web-1:9100""#.to_string(),
            ..Default::default()
        })
        .unwrap();

        let query = source.render_query(LOAD1).unwrap();
        assert_eq!(query, r#"avg(node_load1{instance="web-1:9100"})"#);
        assert!(source.render_query("unmapped").is_none());
    }

    #[test]
    fn test_query_url_keeps_base_path() {
        let source = PrometheusSource::with_defaults("http://prom.internal:9090/prometheus/").unwrap();
        assert_eq!(
            source.query_url().as_str(),
            "http://prom.internal:9090/prometheus/api/v1/query"
        );
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let result = PrometheusSource::with_defaults("not a url");
        assert!(matches!(result, Err(MonitorError::Configuration(_))));
    }

    #[test]
    fn test_default_queries_cover_default_signals() {
        let queries = default_queries();
        for signal in crate::analysis::AnalysisConfig::default().signal_names() {
            assert!(queries.contains_key(&signal), "no query for {}", signal);
        }
    }
}
