//! Report generation.
//!
//! JSON reports are the renderer payloads verbatim. Markdown reports show
//! the same charts as tables for reading in a terminal or a pull request.

use crate::analysis::AxisBound;
use crate::report::payload::{ChartPayload, Report, ReportMetadata, SubsystemReport};
use anyhow::Result;
use serde_json::Value;

/// Rendering options for Markdown reports.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownOptions {
    /// Include the month-by-group data table.
    pub include_table: bool,
    /// Decimal places for values.
    pub precision: usize,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            include_table: true,
            precision: 3,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: MarkdownOptions) -> String {
    let mut output = String::new();

    output.push_str("# Crypto Decentralization Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    for subsystem in &report.subsystems {
        output.push_str(&generate_subsystem_section(subsystem, options));
    }

    output.push_str(&generate_footer());
    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Subsystems:** {}\n", metadata.subsystems));
    section.push_str(&format!(
        "- **Charts:** {} ready, {} without data",
        metadata.charts_ready, metadata.charts_no_data
    ));
    if metadata.charts_unavailable > 0 {
        section.push_str(&format!(", {} unavailable", metadata.charts_unavailable));
    }
    section.push('\n');
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate the section for one subsystem.
fn generate_subsystem_section(subsystem: &SubsystemReport, options: MarkdownOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", subsystem.label));
    section.push_str(&format!("*Snapshot: `{}`*\n\n", subsystem.location));

    for chart in &subsystem.charts {
        section.push_str(&generate_chart_section(chart, options));
    }

    section
}

/// Generate the section for one chart.
fn generate_chart_section(chart: &ChartPayload, options: MarkdownOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", chart.title));

    match chart.status {
        "ready" => {}
        "unavailable" => {
            section.push_str("**Failed to load data**");
            if let Some(ref error) = chart.error {
                section.push_str(&format!(": {}", error));
            }
            section.push_str("\n\n");
            return section;
        }
        _ => {
            section.push_str("*No data available*\n\n");
            return section;
        }
    }

    if let Some(domain) = chart.domain {
        let high = match domain.high {
            AxisBound::Value(v) => format!("{:.*}", options.precision, v),
            AxisBound::Auto => "auto".to_string(),
        };
        section.push_str(&format!(
            "**Axis:** [{:.*}, {}] | **Months shown:** {} of {}\n\n",
            options.precision,
            domain.low,
            high,
            chart.rows.len(),
            chart.months_total
        ));
    }

    if chart.show_legend {
        section.push_str(&generate_legend_table(chart));
    }

    if options.include_table {
        section.push_str(&generate_data_table(chart, options.precision));
    }

    section
}

/// Legend as a table of group, colour and visibility.
fn generate_legend_table(chart: &ChartPayload) -> String {
    let mut table = String::new();

    table.push_str("| Group | Color | Visible |\n");
    table.push_str("|:---|:---:|:---:|\n");

    for entry in &chart.legend {
        let group = if chart.hovered.as_deref() == Some(entry.group.as_str()) {
            format!("**{}**", entry.group)
        } else {
            entry.group.clone()
        };
        let visible = if entry.hidden { "no" } else { "yes" };
        table.push_str(&format!("| {} | `{}` | {} |\n", group, entry.color, visible));
    }
    table.push('\n');

    table
}

/// Month-by-group values of the visible table.
fn generate_data_table(chart: &ChartPayload, precision: usize) -> String {
    let columns: Vec<&str> = chart
        .legend
        .iter()
        .filter(|entry| !entry.hidden || chart.legend.iter().all(|e| e.hidden))
        .map(|entry| entry.group.as_str())
        .collect();

    if columns.is_empty() || chart.rows.is_empty() {
        return String::new();
    }

    let mut table = String::new();

    table.push_str("| Month |");
    for column in &columns {
        table.push_str(&format!(" {} |", column));
    }
    table.push('\n');

    table.push_str("|:---|");
    for _ in &columns {
        table.push_str("---:|");
    }
    table.push('\n');

    for row in &chart.rows {
        let month = row.get("month").and_then(Value::as_str).unwrap_or("");
        table.push_str(&format!("| {} |", month));
        for column in &columns {
            let cell = row
                .get(*column)
                .and_then(Value::as_f64)
                .map(|v| format!("{:.*}", precision, v))
                .unwrap_or_else(|| "-".to_string());
            table.push_str(&format!(" {} |", cell));
        }
        table.push('\n');
    }
    table.push('\n');

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by decentscope*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
