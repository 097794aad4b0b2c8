//! CSV parsing of raw metric snapshots.
//!
//! Parsing is lenient per field: an unreadable number or date blanks that
//! field only, and an undecodable record is skipped without aborting.

use crate::models::{MetricKind, MetricValues, RawRow, Subsystem};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

/// Result of parsing one snapshot.
#[derive(Debug, Clone, Default)]
pub struct ParsedRows {
    pub rows: Vec<RawRow>,
    /// Records the reader could not decode.
    pub skipped_records: usize,
}

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
struct Columns {
    date: Option<usize>,
    subsystem: Option<usize>,
    group: Option<usize>,
    metrics: Vec<(MetricKind, usize)>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        Self {
            date: find("Date"),
            subsystem: find("Subsystem"),
            group: find("Group"),
            metrics: MetricKind::ALL
                .into_iter()
                .filter_map(|metric| find(metric.column_name()).map(|idx| (metric, idx)))
                .collect(),
        }
    }
}

/// Parse a CSV snapshot for `subsystem`.
pub fn parse_rows(text: &str, subsystem: Subsystem) -> ParsedRows {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns = match reader.headers() {
        Ok(headers) => Columns::from_headers(headers),
        Err(e) => {
            debug!("Unreadable header row: {}", e);
            return ParsedRows::default();
        }
    };

    if columns.date.is_none() || columns.group.is_none() {
        debug!("Snapshot for {} lacks a Date or Group column", subsystem);
    }

    let mut parsed = ParsedRows::default();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping undecodable record: {}", e);
                parsed.skipped_records += 1;
                continue;
            }
        };

        if record.iter().all(str::is_empty) {
            continue;
        }

        parsed.rows.push(parse_record(&record, &columns, subsystem));
    }

    parsed
}

fn parse_record(record: &StringRecord, columns: &Columns, fallback: Subsystem) -> RawRow {
    let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty());

    let mut metrics = MetricValues::default();
    for &(metric, idx) in &columns.metrics {
        metrics.set(metric, field(Some(idx)).and_then(parse_number));
    }

    RawRow {
        date: field(columns.date).and_then(parse_date),
        subsystem: field(columns.subsystem)
            .and_then(|s| s.parse().ok())
            .unwrap_or(fallback),
        group: field(columns.group).map(String::from),
        metrics,
    }
}

/// Parse a finite number; anything else is absent.
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a calendar day from the date formats seen in snapshots.
///
/// A bare `YYYY-MM` is read as the first day of that month.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok())
}
