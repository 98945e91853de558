//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use monitor_lib::{CycleResult, CycleSummary, Finding, ResourceScore, Severity};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the per-resource score table
#[derive(Tabled)]
pub struct ResourceRow {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Overall")]
    pub overall: String,
    #[tabled(rename = "Utilization")]
    pub utilization: String,
    #[tabled(rename = "Saturation")]
    pub saturation: String,
    #[tabled(rename = "Errors")]
    pub errors: String,
}

impl From<&ResourceScore> for ResourceRow {
    fn from(score: &ResourceScore) -> Self {
        Self {
            resource: score.resource.clone(),
            status: color_status(&score.status.to_string()),
            overall: format_score(score.overall_score),
            utilization: format_score(score.utilization_score),
            saturation: format_score(score.saturation_score),
            errors: format_score(score.errors_score),
        }
    }
}

/// Row for the cycle history table
#[derive(Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "Started")]
    pub started: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Score")]
    pub score: String,
    #[tabled(rename = "Findings")]
    pub findings: usize,
    #[tabled(rename = "Duration")]
    pub duration: String,
}

impl From<&CycleSummary> for SummaryRow {
    fn from(summary: &CycleSummary) -> Self {
        let status = if summary.failed {
            "failed".red().to_string()
        } else {
            color_status(&summary.overall_status.to_string())
        };
        Self {
            started: summary.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            status,
            score: format_score(summary.overall_score),
            findings: summary.findings,
            duration: format!("{}ms", summary.duration_ms),
        }
    }
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a cycle as a resource table followed by its findings
pub fn print_cycle(result: &CycleResult) {
    println!(
        "{} {}  score {}  ({}ms)",
        "Overall:".bold(),
        color_status(&result.health.overall_status.to_string()),
        format_score(result.health.overall_score),
        result.duration.as_millis()
    );
    if let Some(error) = &result.error {
        print_error(&format!("Cycle failed: {}", error));
    }
    println!();

    let rows: Vec<ResourceRow> = result.health.resources.iter().map(ResourceRow::from).collect();
    print_table(&rows);

    if result.findings.is_empty() {
        println!();
        print_success("No findings");
        return;
    }

    println!();
    println!("{}", "Findings".bold());
    println!("{}", "-".repeat(50));
    for finding in &result.findings {
        print_finding(finding);
    }
}

fn print_finding(finding: &Finding) {
    let marker = match finding.severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::Warning => "WARNING".yellow().bold(),
    };
    println!("{} {}", marker, finding.title.bold());
    println!("  {}", finding.observation);
    println!("  {} {}", "Likely cause:".dimmed(), finding.root_cause_hint);
    println!("  {} {}", "Action:".dimmed(), finding.immediate_action);
    println!();
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a 0-100 score, `n/a` when unknown
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(value) => format!("{:.1}", value),
        None => "n/a".to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" => status.green().to_string(),
        "degraded" | "warning" | "unknown" => status.yellow().to_string(),
        "unhealthy" | "critical" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}
