//! USE Monitor - continuous USE Method analysis daemon
//!
//! Scores host resources from Prometheus on a fixed interval, serves
//! health, metrics and the latest report over HTTP, and exports reports
//! to the log and optionally to JSON files.

use anyhow::{Context, Result};
use monitor_lib::{
    enrich::ChatCompletionEnricher,
    health::{components, HealthRegistry},
    monitor::{CycleHistory, MonitoringScheduler, RunOutcome},
    observability::{MonitorMetrics, StructuredLogger},
    report::{DispatcherConfig, JsonFileSink, LogSink, ReportDispatcher},
    source::PrometheusSource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use use_monitor::{api, config::MonitorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting use-monitor");

    let config = MonitorConfig::load().context("Failed to load configuration")?;
    info!(
        host = %config.target,
        mode = %config.mode,
        interval_secs = config.interval_secs,
        prometheus_url = %config.prometheus_url,
        "Monitor configured"
    );

    let health_registry = HealthRegistry::new();
    for component in components::ALL {
        health_registry.register(component).await;
    }

    let metrics = MonitorMetrics::new();
    let logger = StructuredLogger::new(&config.target);

    let source = PrometheusSource::new(config.prometheus_config())
        .context("Failed to create Prometheus source")?;

    let mut dispatcher = ReportDispatcher::new(logger.clone())
        .sink(Arc::new(LogSink::new(logger.clone())))
        .health_registry(health_registry.clone());
    if let Some(dir) = &config.report_dir {
        info!(dir = %dir.display(), "JSON report export enabled");
        dispatcher = dispatcher.sink(Arc::new(JsonFileSink::new(dir)));
    }
    if let Some(chat) = config.chat_config() {
        info!(url = %chat.url, model = %chat.model, "Insight enrichment enabled");
        let enrich_timeout = Duration::from_secs(chat.timeout_secs);
        let enricher = ChatCompletionEnricher::new(chat).context("Failed to create enricher")?;
        dispatcher = dispatcher.enricher(Arc::new(enricher)).config(DispatcherConfig {
            enrich_timeout,
            ..Default::default()
        });
    }
    let (reports, dispatcher_task) = dispatcher.spawn();

    let history = CycleHistory::new(config.history_size);
    let mut scheduler = MonitoringScheduler::builder()
        .source(Arc::new(source))
        .analysis(config.analysis_config()?)
        .config(config.scheduler_config())
        .history(history.clone())
        .reports(reports)
        .health_registry(health_registry.clone())
        .logger(logger.clone())
        .build()
        .context("Invalid monitor configuration")?;

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        history,
    ));
    health_registry.set_ready(true).await;
    let api_handle = tokio::spawn(api::run_server(config.api_port, app_state));

    // Cancellation is cooperative: the scheduler checks it between cycles
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
        let _ = shutdown_tx.send(());
    });

    match scheduler.run(shutdown_rx).await? {
        RunOutcome::Single(result) => info!(
            overall_status = %result.health.overall_status,
            findings = result.findings.len(),
            failed = result.is_failed(),
            "Single cycle complete"
        ),
        RunOutcome::Continuous(stats) => info!(
            cycles_run = stats.cycles_run,
            cycles_failed = stats.cycles_failed,
            critical_cycles = stats.critical_cycles,
            overruns = stats.overruns,
            "Scheduler stopped"
        ),
    }

    // Dropping the scheduler releases the last report handle
    drop(scheduler);
    let dispatched = dispatcher_task
        .await
        .context("Report dispatcher task failed")?;
    info!(
        reports = dispatched.reports,
        sink_failures = dispatched.sink_failures,
        enrichment_failures = dispatched.enrichment_failures,
        "Reports flushed"
    );

    api_handle.abort();
    info!("Shutting down");
    Ok(())
}
