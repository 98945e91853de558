//! USE Method monitor CLI
//!
//! Runs on-demand USE Method checks against Prometheus and queries a
//! running use-monitor daemon for its reports and health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, daemon};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// USE Method monitor CLI
#[derive(Parser)]
#[command(name = "usem")]
#[command(author, version, about = "CLI for the USE Method monitor", long_about = None)]
pub struct Cli {
    /// Daemon URL (can also be set via USEM_DAEMON_URL env var)
    #[arg(long, env = "USEM_DAEMON_URL", global = true)]
    pub daemon_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single USE Method check against Prometheus
    Check {
        /// Prometheus server URL
        #[arg(long, env = "USEM_PROMETHEUS_URL")]
        prometheus_url: Option<String>,

        /// PromQL label matchers applied to every query
        #[arg(long, env = "USEM_SELECTOR")]
        selector: Option<String>,

        /// Timeout for the metrics fetch in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Also write the JSON report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show the daemon's latest report
    Status,

    /// Show the daemon's recent cycle summaries
    History,

    /// Show the daemon's component health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = config::Config::load()?;

    match cli.command {
        Commands::Check {
            prometheus_url,
            selector,
            timeout_secs,
            output,
        } => {
            if timeout_secs == 0 {
                anyhow::bail!("--timeout-secs must be greater than zero");
            }
            let options = check::CheckOptions {
                prometheus_url: config.prometheus_url(prometheus_url),
                selector: config.selector(selector),
                timeout: Duration::from_secs(timeout_secs),
                output,
            };
            check::run_check(options, cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&config.daemon_url(cli.daemon_url))?;
            daemon::show_status(&client, cli.format).await?;
        }
        Commands::History => {
            let client = client::ApiClient::new(&config.daemon_url(cli.daemon_url))?;
            daemon::show_history(&client, cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&config.daemon_url(cli.daemon_url))?;
            daemon::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
