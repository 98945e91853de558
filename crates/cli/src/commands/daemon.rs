//! Commands that query a running use-monitor daemon

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_cycle, print_json, print_table, print_warning, OutputFormat, SummaryRow};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show the daemon's latest report
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let Some(result) = client.latest_report().await? else {
        print_warning("The monitor has not completed a cycle yet");
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Cycle started:".bold(),
                result.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            print_cycle(&result);
        }
    }
    Ok(())
}

/// Show retained cycle summaries, oldest first
pub async fn show_history(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summaries = client.history().await?;

    match format {
        OutputFormat::Json => print_json(&summaries)?,
        OutputFormat::Table => {
            let rows: Vec<SummaryRow> = summaries.iter().map(SummaryRow::from).collect();
            print_table(&rows);
        }
    }
    Ok(())
}

/// Show the daemon's component health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            let status = format!("{:?}", health.status).to_lowercase();
            println!("{} {}", "Daemon:".bold(), color_status(&status));
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| {
                    let status = format!("{:?}", component.status).to_lowercase();
                    ComponentRow {
                        component: name.clone(),
                        status: color_status(&status),
                        message: component.message.clone().unwrap_or_default(),
                    }
                })
                .collect();
            rows.sort_by(|a, b| a.component.cmp(&b.component));
            print_table(&rows);
        }
    }
    Ok(())
}
