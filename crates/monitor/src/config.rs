//! Daemon configuration
//!
//! Loaded from an optional TOML file (`USEMON_CONFIG_FILE`, default
//! `use-monitor.toml`) layered under `USEMON_*` environment variables.
//! Nested keys use `__`, e.g. `USEMON_ENRICHER__ENABLED=true`.

use anyhow::{Context, Result};
use monitor_lib::analysis::{AnalysisConfig, ScoreWeights, ThresholdCheck};
use monitor_lib::enrich::ChatConfig;
use monitor_lib::monitor::{RunMode, SchedulerConfig};
use monitor_lib::source::{default_queries, PrometheusConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Config file used when `USEMON_CONFIG_FILE` is not set
pub const DEFAULT_CONFIG_FILE: &str = "use-monitor.toml";

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Label for the monitored host in logs
    #[serde(default = "default_target")]
    pub target: String,

    /// Port for health, metrics and report endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    #[serde(default = "default_prometheus_timeout")]
    pub prometheus_timeout_secs: u64,

    /// PromQL label matchers injected into every query
    #[serde(default)]
    pub selector: String,

    #[serde(default)]
    pub mode: RunMode,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Directory for JSON report export; disabled when unset
    #[serde(default)]
    pub report_dir: Option<PathBuf>,

    #[serde(default)]
    pub weights: Option<ScoreWeights>,

    /// Per-resource threshold overrides
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<ThresholdCheck>>,

    /// Per-signal PromQL overrides
    #[serde(default)]
    pub queries: BTreeMap<String, String>,

    #[serde(default)]
    pub enricher: EnricherSettings,
}

/// Optional chat completion enrichment
#[derive(Debug, Clone, Deserialize)]
pub struct EnricherSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_enricher_url")]
    pub url: String,
    #[serde(default = "default_enricher_model")]
    pub model: String,
    #[serde(default = "default_enricher_temperature")]
    pub temperature: f32,
    #[serde(default = "default_enricher_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_enricher_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_enricher_url(),
            model: default_enricher_model(),
            temperature: default_enricher_temperature(),
            max_tokens: default_enricher_max_tokens(),
            timeout_secs: default_enricher_timeout(),
            api_key: None,
        }
    }
}

fn default_target() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_prometheus_timeout() -> u64 {
    30
}

fn default_interval() -> u64 {
    300
}

fn default_history_size() -> usize {
    monitor_lib::monitor::DEFAULT_HISTORY_SIZE
}

fn default_enricher_url() -> String {
    ChatConfig::default().url
}

fn default_enricher_model() -> String {
    ChatConfig::default().model
}

fn default_enricher_temperature() -> f32 {
    ChatConfig::default().temperature
}

fn default_enricher_max_tokens() -> u32 {
    ChatConfig::default().max_tokens
}

fn default_enricher_timeout() -> u64 {
    ChatConfig::default().timeout_secs
}

impl MonitorConfig {
    /// Load from the default file location and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("USEMON_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file (which may be absent) and environment
    ///
    /// Invalid values are errors; nothing falls back to defaults silently.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("USEMON")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let config: MonitorConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything the scheduler would reject at construction
    pub fn validate(&self) -> Result<()> {
        self.scheduler_config()
            .validate()
            .context("Invalid scheduler settings")?;
        self.analysis_config()?
            .validate()
            .context("Invalid analysis settings")?;
        if self.prometheus_timeout_secs == 0 {
            anyhow::bail!("prometheus_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            mode: self.mode,
            interval: Duration::from_secs(self.interval_secs),
            fetch_timeout: Duration::from_secs(self.prometheus_timeout_secs),
            history_size: self.history_size,
        }
    }

    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let analysis = AnalysisConfig {
            weights: self.weights.unwrap_or_default(),
            ..Default::default()
        };
        analysis
            .with_threshold_overrides(&self.thresholds)
            .context("Invalid threshold overrides")
    }

    pub fn prometheus_config(&self) -> PrometheusConfig {
        let mut queries = default_queries();
        queries.extend(self.queries.clone());
        PrometheusConfig {
            base_url: self.prometheus_url.clone(),
            timeout: Duration::from_secs(self.prometheus_timeout_secs),
            selector: self.selector.clone(),
            queries,
        }
    }

    /// Chat settings when enrichment is enabled
    pub fn chat_config(&self) -> Option<ChatConfig> {
        if !self.enricher.enabled {
            return None;
        }
        Some(ChatConfig {
            url: self.enricher.url.clone(),
            model: self.enricher.model.clone(),
            temperature: self.enricher.temperature,
            max_tokens: self.enricher.max_tokens,
            timeout_secs: self.enricher.timeout_secs,
            api_key: self.enricher.api_key.clone(),
        })
    }
}
