//! On-demand single analysis cycle against Prometheus

use anyhow::{Context, Result};
use monitor_lib::{
    monitor::{MonitoringScheduler, RunMode},
    observability::StructuredLogger,
    report::CycleReport,
    source::{default_queries, PrometheusConfig, PrometheusSource},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::output::{print_cycle, print_info, print_json, OutputFormat};

/// Settings for `usem check`
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub prometheus_url: String,
    pub selector: String,
    pub timeout: Duration,
    pub output: Option<PathBuf>,
}

/// Run one cycle, print it, and optionally write the JSON report
///
/// Returns an error when the cycle failed so the exit status reflects it.
pub async fn run_check(options: CheckOptions, format: OutputFormat) -> Result<()> {
    let source = PrometheusSource::new(PrometheusConfig {
        base_url: options.prometheus_url.clone(),
        timeout: options.timeout,
        selector: options.selector.clone(),
        queries: default_queries(),
    })
    .context("Failed to create Prometheus source")?;

    let label = if options.selector.is_empty() {
        options.prometheus_url.clone()
    } else {
        options.selector.clone()
    };

    let mut scheduler = MonitoringScheduler::builder()
        .source(Arc::new(source))
        .mode(RunMode::Single)
        .fetch_timeout(options.timeout)
        .logger(StructuredLogger::new(label))
        .build()
        .context("Invalid check settings")?;

    debug!(prometheus_url = %options.prometheus_url, "Running single check");
    let result = scheduler.run_single().await?;
    let report = CycleReport::new(result.clone());

    if let Some(path) = &options.output {
        let json = serde_json::to_string_pretty(&report.document())
            .context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => print_json(&report.document())?,
        OutputFormat::Table => {
            print_cycle(&result);
            if let Some(path) = &options.output {
                print_info(&format!("Report written to {}", path.display()));
            }
        }
    }

    if let Some(error) = &result.error {
        anyhow::bail!("Check failed: {}", error);
    }
    Ok(())
}
