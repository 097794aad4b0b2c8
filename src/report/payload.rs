//! Renderer payloads.
//!
//! These are the structures a chart renderer consumes: the visible table
//! flattened into one object per month, the axis domain, and the legend.

use crate::analysis::{legend, AxisDomain, LegendEntry};
use crate::dashboard::{ChartSession, ChartState, Dashboard};
use crate::models::{MetricKind, SeriesTable, Subsystem};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Everything a renderer needs to draw one chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPayload {
    pub subsystem: Subsystem,
    pub metric: MetricKind,
    pub title: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub show_legend: bool,
    pub legend: Vec<LegendEntry>,
    pub hidden: Vec<String>,
    pub hovered: Option<String>,
    /// Months in the unfiltered table.
    pub months_total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<AxisDomain>,
    pub rows: Vec<Map<String, Value>>,
}

impl ChartPayload {
    /// Snapshot a chart session.
    pub fn from_session(subsystem: Subsystem, metric: MetricKind, session: &ChartSession) -> Self {
        let view = session.view();
        let state = session.state();

        let mut payload = Self {
            subsystem,
            metric,
            title: metric.title(),
            status: state.label(),
            error: None,
            show_legend: false,
            legend: Vec::new(),
            hidden: view.hidden().iter().cloned().collect(),
            hovered: view.hovered().map(String::from),
            months_total: 0,
            domain: None,
            rows: Vec::new(),
        };

        match state {
            ChartState::Ready(chart) => {
                payload.show_legend = chart.groups.len() > 1;
                payload.legend = legend(&chart.groups, view);
                payload.months_total = chart.table.len();
                if let Some(derived) = session.derived() {
                    payload.domain = Some(derived.domain);
                    payload.rows = flatten_rows(&derived.table);
                }
            }
            ChartState::Unavailable(reason) => payload.error = Some(reason.clone()),
            _ => {}
        }

        payload
    }
}

/// Flatten each entry into `{"month": "YYYY-MM", "<group>": value|null}`.
pub fn flatten_rows(table: &SeriesTable) -> Vec<Map<String, Value>> {
    table
        .entries()
        .iter()
        .map(|entry| {
            let mut row = Map::new();
            row.insert("month".to_string(), Value::String(entry.month.to_string()));
            for (group, value) in &entry.values {
                let value = value
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number);
                row.insert(group.clone(), value);
            }
            row
        })
        .collect()
}

/// All charts of one subsystem.
#[derive(Debug, Clone, Serialize)]
pub struct SubsystemReport {
    pub subsystem: Subsystem,
    pub label: &'static str,
    /// Where the snapshot was loaded from.
    pub location: String,
    pub charts: Vec<ChartPayload>,
}

impl SubsystemReport {
    /// Snapshot every chart of a loaded dashboard.
    pub fn from_dashboard(subsystem: Subsystem, location: String, dashboard: &Dashboard) -> Self {
        Self {
            subsystem,
            label: subsystem.label(),
            location,
            charts: dashboard
                .charts()
                .map(|(metric, session)| ChartPayload::from_session(subsystem, metric, session))
                .collect(),
        }
    }

    /// Raw rows behind the first loaded chart.
    pub fn rows_loaded(dashboard: &Dashboard) -> usize {
        dashboard
            .charts()
            .find_map(|(_, session)| match session.state() {
                ChartState::Ready(chart) => Some(chart.rows_loaded),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// Metadata about a report run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub subsystems: usize,
    pub charts_ready: usize,
    pub charts_no_data: usize,
    pub charts_unavailable: usize,
    pub duration_seconds: f64,
}

/// The complete dashboard report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub subsystems: Vec<SubsystemReport>,
}

impl Report {
    /// Build a report and count chart states.
    pub fn new(
        source: String,
        subsystems: Vec<SubsystemReport>,
        duration_seconds: f64,
    ) -> Self {
        let count = |status: &str| {
            subsystems
                .iter()
                .flat_map(|s| &s.charts)
                .filter(|c| c.status == status)
                .count()
        };

        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            source,
            subsystems: subsystems.len(),
            charts_ready: count("ready"),
            charts_no_data: count("no_data"),
            charts_unavailable: count("unavailable"),
            duration_seconds,
        };

        Self {
            metadata,
            subsystems,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRow;

    fn loaded_dashboard() -> Dashboard {
        let rows = vec![
            RawRow::single("2021-01-10", "Ethereum", MetricKind::Entropy, 0.9),
            RawRow::single("2021-02-10", "Bitcoin", MetricKind::Entropy, 1.0),
            RawRow::single("2021-03-10", "Bitcoin", MetricKind::Entropy, 4.0),
        ];
        let mut dashboard = Dashboard::new(&[MetricKind::Entropy, MetricKind::Count]);
        let ticket = dashboard.select_subsystem(Subsystem::Consensus);
        dashboard.complete(ticket, Ok(rows));
        dashboard
    }

    #[test]
    fn test_payload_ready() {
        let mut dashboard = loaded_dashboard();
        dashboard.toggle("Ethereum");
        let session = dashboard.chart(MetricKind::Entropy).unwrap();
        let payload =
            ChartPayload::from_session(Subsystem::Consensus, MetricKind::Entropy, session);

        assert_eq!(payload.status, "ready");
        assert!(payload.show_legend);
        assert_eq!(payload.months_total, 3);
        assert_eq!(payload.rows.len(), 2);
        assert_eq!(payload.hidden, vec!["Ethereum"]);
        assert_eq!(payload.rows[0]["month"], "2021-02");
        assert_eq!(payload.rows[0]["Ethereum"], Value::Null);
        assert_eq!(payload.rows[0]["Bitcoin"], 1.0);
    }

    #[test]
    fn test_payload_no_data() {
        let dashboard = loaded_dashboard();
        let session = dashboard.chart(MetricKind::Count).unwrap();
        let payload = ChartPayload::from_session(Subsystem::Consensus, MetricKind::Count, session);

        assert_eq!(payload.status, "no_data");
        assert!(payload.rows.is_empty());
        assert!(payload.domain.is_none());
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_payload_json_shape() {
        let dashboard = loaded_dashboard();
        let session = dashboard.chart(MetricKind::Entropy).unwrap();
        let payload =
            ChartPayload::from_session(Subsystem::Consensus, MetricKind::Entropy, session);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["subsystem"], "consensus");
        assert_eq!(json["metric"], "Entropy");
        assert_eq!(json["title"], "Shannon Entropy");
        assert!(json["domain"].is_array());
        assert_eq!(json["legend"][0]["group"], "Ethereum");
    }

    #[test]
    fn test_report_counts() {
        let dashboard = loaded_dashboard();
        let subsystem =
            SubsystemReport::from_dashboard(Subsystem::Consensus, "fixtures".into(), &dashboard);
        assert_eq!(SubsystemReport::rows_loaded(&dashboard), 3);

        let report = Report::new("fixtures".into(), vec![subsystem], 0.1);
        assert_eq!(report.metadata.charts_ready, 1);
        assert_eq!(report.metadata.charts_no_data, 1);
        assert_eq!(report.metadata.charts_unavailable, 0);
    }
}
