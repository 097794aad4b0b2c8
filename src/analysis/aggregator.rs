//! Monthly aggregation of raw rows.
//!
//! Raw rows carry one observation per entity per day. This module buckets
//! them by calendar month and averages each entity's observations within a
//! month, producing a gap-filled series table.

use crate::models::{GroupSet, MetricKind, MonthKey, RawRow, SeriesEntry, SeriesTable};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Aggregate raw rows into a monthly series table for one metric.
///
/// Rows without a date, without a group, or without a value for `metric`
/// are dropped. Every emitted month carries an entry for every group in
/// `groups`; a group without observations that month maps to `None`.
pub fn aggregate(rows: &[RawRow], metric: MetricKind, groups: &GroupSet) -> SeriesTable {
    let mut partitions: BTreeMap<MonthKey, HashMap<&str, Vec<f64>>> = BTreeMap::new();
    let mut dropped = 0usize;

    for row in rows {
        let (Some(date), Some(group), Some(value)) =
            (row.date, row.group.as_deref(), row.metrics.get(metric))
        else {
            dropped += 1;
            continue;
        };
        if group.is_empty() {
            dropped += 1;
            continue;
        }

        partitions
            .entry(MonthKey::from_date(date))
            .or_default()
            .entry(group)
            .or_default()
            .push(value);
    }

    if dropped > 0 {
        debug!("Dropped {} incomplete rows for {}", dropped, metric);
    }

    let entries = partitions
        .into_iter()
        .map(|(month, mut by_group)| {
            let values = groups
                .iter()
                .map(|group| {
                    let mean = by_group.get_mut(group).map(|obs| mean(obs));
                    (group.to_string(), mean)
                })
                .collect();
            SeriesEntry { month, values }
        })
        .collect();

    SeriesTable::from_sorted(entries)
}

/// Arithmetic mean of the observations.
///
/// Values are summed in ascending order so the result does not depend on
/// the order rows arrived in.
fn mean(observations: &mut [f64]) -> f64 {
    observations.sort_by(f64::total_cmp);
    let sum: f64 = observations.iter().sum();
    sum / observations.len() as f64
}

/// Count the rows that survive filtering for a metric.
pub fn usable_rows(rows: &[RawRow], metric: MetricKind) -> usize {
    rows.iter()
        .filter(|row| {
            row.date.is_some()
                && row.group.as_deref().is_some_and(|g| !g.is_empty())
                && row.metrics.get(metric).is_some()
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValues;

    fn bitcoin_rows() -> Vec<RawRow> {
        vec![
            RawRow::single("2021-01-05", "Bitcoin", MetricKind::Entropy, 2.0),
            RawRow::single("2021-01-20", "Bitcoin", MetricKind::Entropy, 3.0),
            RawRow::single("2021-02-01", "Bitcoin", MetricKind::Entropy, 1.0),
        ]
    }

    #[test]
    fn test_monthly_mean() {
        let rows = bitcoin_rows();
        let groups = GroupSet::from_rows(&rows);
        let table = aggregate(&rows, MetricKind::Entropy, &groups);

        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].month.to_string(), "2021-01");
        assert_eq!(table.entries()[0].value("Bitcoin"), Some(2.5));
        assert_eq!(table.entries()[1].month.to_string(), "2021-02");
        assert_eq!(table.entries()[1].value("Bitcoin"), Some(1.0));
    }

    #[test]
    fn test_absent_group_is_none_not_zero() {
        let rows = vec![
            RawRow::single("2021-01-05", "Bitcoin", MetricKind::Gini, 0.7),
            RawRow::single("2021-02-05", "Ethereum", MetricKind::Gini, 0.4),
        ];
        let groups = GroupSet::from_rows(&rows);
        let table = aggregate(&rows, MetricKind::Gini, &groups);

        let jan = &table.entries()[0];
        assert!(jan.values.contains_key("Ethereum"));
        assert_eq!(jan.values.get("Ethereum"), Some(&None));
        let feb = &table.entries()[1];
        assert_eq!(feb.values.get("Bitcoin"), Some(&None));
        assert_eq!(feb.value("Ethereum"), Some(0.4));
    }

    #[test]
    fn test_months_strictly_ascending() {
        let rows = vec![
            RawRow::single("2022-03-01", "A", MetricKind::Count, 1.0),
            RawRow::single("2020-12-31", "A", MetricKind::Count, 1.0),
            RawRow::single("2021-01-01", "B", MetricKind::Count, 1.0),
            RawRow::single("2022-03-15", "B", MetricKind::Count, 1.0),
        ];
        let groups = GroupSet::from_rows(&rows);
        let table = aggregate(&rows, MetricKind::Count, &groups);
        let months: Vec<_> = table.months().collect();

        assert_eq!(months.len(), 3);
        assert!(months.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let mut no_value = RawRow::single("2021-03-01", "Bitcoin", MetricKind::Nakamoto, 4.0);
        no_value.metrics = MetricValues::default();
        let mut no_date = RawRow::single("2021-04-01", "Bitcoin", MetricKind::Nakamoto, 4.0);
        no_date.date = None;
        let mut no_group = RawRow::single("2021-05-01", "Bitcoin", MetricKind::Nakamoto, 4.0);
        no_group.group = None;

        let rows = vec![
            RawRow::single("2021-01-01", "Bitcoin", MetricKind::Nakamoto, 4.0),
            no_value,
            no_date,
            no_group,
        ];
        let groups = GroupSet::from_rows(&rows);
        let table = aggregate(&rows, MetricKind::Nakamoto, &groups);

        assert_eq!(table.len(), 1);
        assert_eq!(usable_rows(&rows, MetricKind::Nakamoto), 1);
    }

    #[test]
    fn test_no_surviving_rows_is_empty_table() {
        let rows = bitcoin_rows();
        let groups = GroupSet::from_rows(&rows);
        let table = aggregate(&rows, MetricKind::Hhi, &groups);
        assert!(table.is_empty());
    }

    #[test]
    fn test_order_independent() {
        let rows = vec![
            RawRow::single("2021-01-01", "A", MetricKind::Entropy, 0.1),
            RawRow::single("2021-01-02", "A", MetricKind::Entropy, 0.2),
            RawRow::single("2021-01-03", "A", MetricKind::Entropy, 0.3),
            RawRow::single("2021-01-04", "B", MetricKind::Entropy, 1e16),
            RawRow::single("2021-01-05", "B", MetricKind::Entropy, 1.0),
            RawRow::single("2021-01-06", "B", MetricKind::Entropy, -1e16),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();
        let groups = GroupSet::from_names(["A", "B"]);

        assert_eq!(
            aggregate(&rows, MetricKind::Entropy, &groups),
            aggregate(&reversed, MetricKind::Entropy, &groups)
        );
    }

    #[test]
    fn test_mean_of_raw_observations() {
        // Two observations on one day and one on another: plain mean of all three.
        let rows = vec![
            RawRow::single("2021-06-01", "Tron", MetricKind::Hhi, 0.3),
            RawRow::single("2021-06-01", "Tron", MetricKind::Hhi, 0.3),
            RawRow::single("2021-06-02", "Tron", MetricKind::Hhi, 0.9),
        ];
        let groups = GroupSet::from_rows(&rows);
        let table = aggregate(&rows, MetricKind::Hhi, &groups);
        let value = table.entries()[0].value("Tron").unwrap();
        assert!((value - 0.5).abs() < 1e-12);
    }
}
