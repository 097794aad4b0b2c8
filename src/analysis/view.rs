//! Chart view state and derivation of the visible series.
//!
//! `ViewState` is an immutable value: every transition returns a new state.
//! `derive` turns the full series table plus the hidden set into the table
//! and axis domain a renderer draws.

use crate::models::{GroupSet, SeriesTable};
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

/// Fraction of the value range added above and below the extrema.
pub const DOMAIN_PADDING: f64 = 0.05;

/// Hidden lines and hover focus of one chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    hidden: BTreeSet<String>,
    hovered: Option<String>,
}

impl ViewState {
    /// Flip the hidden flag of a group.
    #[must_use]
    pub fn toggle(&self, group: &str) -> Self {
        let mut next = self.clone();
        if !next.hidden.remove(group) {
            next.hidden.insert(group.to_string());
        }
        next
    }

    /// Hide a group. Hiding an already hidden group is a no-op.
    #[must_use]
    pub fn hide(&self, group: &str) -> Self {
        let mut next = self.clone();
        next.hidden.insert(group.to_string());
        next
    }

    /// Set or clear the hovered group.
    #[must_use]
    pub fn with_hover(&self, group: Option<&str>) -> Self {
        Self {
            hidden: self.hidden.clone(),
            hovered: group.map(String::from),
        }
    }

    /// Back to no hidden lines and no hover.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self::default()
    }

    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn is_hidden(&self, group: &str) -> bool {
        self.hidden.contains(group)
    }

    /// Derive the visible table and axis domain for this state.
    pub fn derive(&self, table: &SeriesTable, groups: &GroupSet) -> DerivedView {
        derive(table, groups, &self.hidden)
    }
}

/// Upper bound of the value axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisBound {
    /// Let the renderer autoscale.
    Auto,
    Value(f64),
}

impl Serialize for AxisBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AxisBound::Auto => serializer.serialize_str("auto"),
            AxisBound::Value(v) => serializer.serialize_f64(*v),
        }
    }
}

/// Value axis domain, serialized as `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisDomain {
    pub low: f64,
    pub high: AxisBound,
}

impl AxisDomain {
    /// Domain used when there is nothing to scale against.
    pub const AUTO: AxisDomain = AxisDomain {
        low: 0.0,
        high: AxisBound::Auto,
    };

    /// Pads the extrema and keeps the lower bound non-negative.
    pub fn from_extrema(min: f64, max: f64) -> Self {
        let padding = (max - min) * DOMAIN_PADDING;
        Self {
            low: (min - padding).max(0.0),
            high: AxisBound::Value(max + padding),
        }
    }
}

impl Serialize for AxisDomain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.low)?;
        tuple.serialize_element(&self.high)?;
        tuple.end()
    }
}

/// What the renderer draws for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView {
    /// Months where at least one visible group has data.
    pub table: SeriesTable,
    pub domain: AxisDomain,
}

/// Filter the table to the visible groups and compute the axis domain.
///
/// Hiding every group behaves like hiding none.
pub fn derive(table: &SeriesTable, groups: &GroupSet, hidden: &BTreeSet<String>) -> DerivedView {
    let mut visible: Vec<&str> = groups.iter().filter(|g| !hidden.contains(*g)).collect();
    if visible.is_empty() {
        visible = groups.iter().collect();
    }

    let visible_table = table.filtered(|entry| entry.has_any(visible.iter().copied()));

    let extrema = visible_table
        .entries()
        .iter()
        .flat_map(|entry| visible.iter().filter_map(move |g| entry.value(g)))
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        });

    let domain = match extrema {
        Some((min, max)) => AxisDomain::from_extrema(min, max),
        None => AxisDomain::AUTO,
    };

    DerivedView {
        table: visible_table,
        domain,
    }
}
