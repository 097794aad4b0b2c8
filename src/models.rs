//! Data models for the decentralization dashboard.
//!
//! This module contains the core data structures shared by the source,
//! the aggregator and the report generator: subsystems, metrics, raw rows,
//! month buckets and the monthly series table.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the tracked crypto subsystems.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    /// Block producers and validators
    #[value(name = "consensus")]
    Consensus,
    /// Protocol developers
    #[value(name = "developers")]
    Developers,
    /// Exchanges
    #[value(name = "exchanges")]
    Exchanges,
    /// DeFi governance token holders
    #[value(name = "defi_gov")]
    DefiGov,
    /// DeFi total value locked
    #[value(name = "defi_tvl")]
    DefiTvl,
    /// NFT marketplaces
    #[value(name = "nft_marketplace")]
    NftMarketplace,
}

impl Subsystem {
    /// All subsystems, in the order they are offered to the user.
    pub const ALL: [Subsystem; 6] = [
        Subsystem::Consensus,
        Subsystem::DefiGov,
        Subsystem::DefiTvl,
        Subsystem::Developers,
        Subsystem::Exchanges,
        Subsystem::NftMarketplace,
    ];

    /// File stem of the raw snapshot for this subsystem.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Subsystem::Consensus => "consensus",
            Subsystem::Developers => "developers",
            Subsystem::Exchanges => "exchanges",
            Subsystem::DefiGov => "defi_gov",
            Subsystem::DefiTvl => "defi_tvl",
            Subsystem::NftMarketplace => "nft_marketplace",
        }
    }

    /// Name of the raw snapshot file for this subsystem.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.file_stem())
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Subsystem::Consensus => "Consensus",
            Subsystem::Developers => "Developers",
            Subsystem::Exchanges => "Exchanges",
            Subsystem::DefiGov => "DeFi Governance",
            Subsystem::DefiTvl => "DeFi TVL",
            Subsystem::NftMarketplace => "NFT Marketplace",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Subsystem {
    type Err = String;

    /// Accepts either the file stem or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Subsystem::ALL
            .into_iter()
            .find(|sub| {
                sub.file_stem().eq_ignore_ascii_case(needle)
                    || sub.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| format!("Unknown subsystem: {}", needle))
    }
}

/// Decentralization metric carried by every raw row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum MetricKind {
    #[value(name = "entropy")]
    Entropy,
    #[value(name = "nakamoto")]
    Nakamoto,
    #[value(name = "gini")]
    Gini,
    #[serde(rename = "HHI")]
    #[value(name = "hhi")]
    Hhi,
    #[value(name = "count")]
    Count,
}

impl MetricKind {
    /// All metrics, in chart order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Entropy,
        MetricKind::Nakamoto,
        MetricKind::Gini,
        MetricKind::Hhi,
        MetricKind::Count,
    ];

    /// Column header of this metric in the raw snapshot.
    pub fn column_name(&self) -> &'static str {
        match self {
            MetricKind::Entropy => "Entropy",
            MetricKind::Nakamoto => "Nakamoto",
            MetricKind::Gini => "Gini",
            MetricKind::Hhi => "HHI",
            MetricKind::Count => "Count",
        }
    }

    /// Chart title for this metric.
    pub fn title(&self) -> &'static str {
        match self {
            MetricKind::Entropy => "Shannon Entropy",
            MetricKind::Nakamoto => "Nakamoto Coefficient",
            MetricKind::Gini => "Gini Coefficient",
            MetricKind::Hhi => "Herfindahl-Hirschman Index",
            MetricKind::Count => "Number of Entities",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// Per-row metric values. Any of them may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub entropy: Option<f64>,
    pub nakamoto: Option<f64>,
    pub gini: Option<f64>,
    pub hhi: Option<f64>,
    pub count: Option<f64>,
}

impl MetricValues {
    /// Returns the value for a metric, if present.
    pub fn get(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::Entropy => self.entropy,
            MetricKind::Nakamoto => self.nakamoto,
            MetricKind::Gini => self.gini,
            MetricKind::Hhi => self.hhi,
            MetricKind::Count => self.count,
        }
    }

    /// Sets the value for a metric.
    pub fn set(&mut self, metric: MetricKind, value: Option<f64>) {
        let slot = match metric {
            MetricKind::Entropy => &mut self.entropy,
            MetricKind::Nakamoto => &mut self.nakamoto,
            MetricKind::Gini => &mut self.gini,
            MetricKind::Hhi => &mut self.hhi,
            MetricKind::Count => &mut self.count,
        };
        *slot = value;
    }
}

/// One observation of one entity on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Observation day.
    pub date: Option<NaiveDate>,
    /// Subsystem the row belongs to.
    pub subsystem: Subsystem,
    /// Entity name.
    pub group: Option<String>,
    /// Metric values.
    pub metrics: MetricValues,
}

impl RawRow {
    /// Creates a row with a single metric value set.
    #[cfg(test)]
    pub fn single(date: &str, group: &str, metric: MetricKind, value: f64) -> Self {
        let mut metrics = MetricValues::default();
        metrics.set(metric, Some(value));
        Self {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            subsystem: Subsystem::Consensus,
            group: Some(group.to_string()),
            metrics,
        }
    }
}

/// Calendar year-month bucket.
///
/// Ordering is calendar order, which matches the lexicographic order of
/// the zero-padded `YYYY-MM` rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Creates a key, returning `None` for an invalid month.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Truncates a date to its month.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {}", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid year in month key: {}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month in month key: {}", s))?;
        MonthKey::new(year, month).ok_or_else(|| format!("Month out of range: {}", s))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One month of the series table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    /// Month bucket.
    pub month: MonthKey,
    /// Monthly mean per group; `None` when the group had no observation.
    pub values: BTreeMap<String, Option<f64>>,
}

impl SeriesEntry {
    /// Returns the value of a group for this month, if present.
    pub fn value(&self, group: &str) -> Option<f64> {
        self.values.get(group).copied().flatten()
    }

    /// Whether any of the given groups has a value this month.
    pub fn has_any<'a>(&self, mut groups: impl Iterator<Item = &'a str>) -> bool {
        groups.any(|group| self.value(group).is_some())
    }
}

/// Monthly per-group series, ascending by month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesTable {
    entries: Vec<SeriesEntry>,
}

impl SeriesTable {
    /// Builds a table from entries that are already in ascending month order.
    pub fn from_sorted(entries: Vec<SeriesEntry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].month < w[1].month));
        Self { entries }
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Months covered by the table.
    pub fn months(&self) -> impl Iterator<Item = MonthKey> + '_ {
        self.entries.iter().map(|e| e.month)
    }

    /// Keeps only entries matching the predicate, preserving order.
    pub fn filtered(&self, mut keep: impl FnMut(&SeriesEntry) -> bool) -> Self {
        Self {
            entries: self.entries.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }
}

/// Distinct group names in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSet {
    names: Vec<String>,
}

impl GroupSet {
    /// Collects non-empty group names from raw rows, keeping first-seen order.
    pub fn from_rows(rows: &[RawRow]) -> Self {
        Self::from_names(rows.iter().filter_map(|row| row.group.as_deref()))
    }

    /// Builds a set from names, dropping blanks and duplicates.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::default();
        for name in names {
            if !name.is_empty() && !set.contains(name) {
                set.names.push(name.to_string());
            }
        }
        set
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_from_str() {
        assert_eq!("defi_gov".parse::<Subsystem>(), Ok(Subsystem::DefiGov));
        assert_eq!("DeFi TVL".parse::<Subsystem>(), Ok(Subsystem::DefiTvl));
        assert_eq!(" Consensus ".parse::<Subsystem>(), Ok(Subsystem::Consensus));
        assert!("mining".parse::<Subsystem>().is_err());
    }

    #[test]
    fn test_subsystem_file_name() {
        assert_eq!(Subsystem::NftMarketplace.file_name(), "nft_marketplace.csv");
        assert_eq!(Subsystem::DefiGov.label(), "DeFi Governance");
    }

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(serde_json::to_string(&MetricKind::Hhi).unwrap(), "\"HHI\"");
        assert_eq!(serde_json::to_string(&MetricKind::Gini).unwrap(), "\"Gini\"");
        assert_eq!(MetricKind::Count.title(), "Number of Entities");
    }

    #[test]
    fn test_month_key_ordering_matches_string_order() {
        let a = MonthKey::new(2020, 12).unwrap();
        let b = MonthKey::new(2021, 2).unwrap();
        let c = MonthKey::new(2021, 11).unwrap();
        assert!(a < b && b < c);
        assert!(a.to_string() < b.to_string() && b.to_string() < c.to_string());
        assert_eq!(b.to_string(), "2021-02");
    }

    #[test]
    fn test_month_key_parse_and_serde() {
        let key: MonthKey = "2021-07".parse().unwrap();
        assert_eq!(Some(key), MonthKey::new(2021, 7));
        assert!("2021-13".parse::<MonthKey>().is_err());
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2021-07\"");
    }

    #[test]
    fn test_month_key_from_date_drops_day() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        assert_eq!(MonthKey::from_date(date).to_string(), "2023-03");
    }

    #[test]
    fn test_group_set_first_seen_order() {
        let rows = vec![
            RawRow::single("2021-01-01", "Solana", MetricKind::Gini, 0.5),
            RawRow::single("2021-01-01", "Bitcoin", MetricKind::Gini, 0.5),
            RawRow::single("2021-01-02", "Solana", MetricKind::Gini, 0.5),
            RawRow {
                group: None,
                ..RawRow::single("2021-01-02", "x", MetricKind::Gini, 0.5)
            },
        ];
        let groups = GroupSet::from_rows(&rows);
        assert_eq!(groups.iter().collect::<Vec<_>>(), vec!["Solana", "Bitcoin"]);
        assert!(groups.contains("Bitcoin"));
    }

    #[test]
    fn test_metric_values_get_set() {
        let mut values = MetricValues::default();
        values.set(MetricKind::Hhi, Some(0.12));
        assert_eq!(values.get(MetricKind::Hhi), Some(0.12));
        assert_eq!(values.get(MetricKind::Count), None);
    }
}
