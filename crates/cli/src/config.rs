//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Built-in defaults when neither flag, env nor config file set a value
pub const DEFAULT_DAEMON_URL: &str = "http://localhost:8080";
pub const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";

/// CLI configuration
///
/// Every field only supplies a default; flags and `USEM_*` variables win.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Base URL of a running use-monitor daemon
    pub daemon_url: Option<String>,
    /// Prometheus server used by `usem check`
    pub prometheus_url: Option<String>,
    /// PromQL label matchers for `usem check`
    pub selector: Option<String>,
}

impl Config {
    /// Load configuration from `~/.config/usem/config.json`
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from a specific path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Flag or env value, then config file, then built-in default
    pub fn daemon_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.daemon_url.clone())
            .unwrap_or_else(|| DEFAULT_DAEMON_URL.to_string())
    }

    pub fn prometheus_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.prometheus_url.clone())
            .unwrap_or_else(|| DEFAULT_PROMETHEUS_URL.to_string())
    }

    pub fn selector(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.selector.clone()).unwrap_or_default()
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("usem").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.daemon_url(None), DEFAULT_DAEMON_URL);
        assert_eq!(config.prometheus_url(None), DEFAULT_PROMETHEUS_URL);
        assert_eq!(config.selector(None), "");
    }

    #[test]
    fn test_flags_take_precedence_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"daemon_url": "http://monitor:8080", "selector": "instance=\"db-1:9100\""}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.daemon_url(None), "http://monitor:8080");
        assert_eq!(
            config.daemon_url(Some("http://other:9000".to_string())),
            "http://other:9000"
        );
        assert_eq!(config.selector(None), r#"instance="db-1:9100""#);
        assert_eq!(config.prometheus_url(None), DEFAULT_PROMETHEUS_URL);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
