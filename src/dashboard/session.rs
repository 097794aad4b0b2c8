//! Per-chart session: selection, fetch lifecycle and view state.
//!
//! A chart is keyed by a `(subsystem, metric)` selection. Every selection
//! issues a ticket; a fetch result is applied only if its ticket is still
//! the current one, so a slow fetch for an old selection can never
//! overwrite a newer one.

use crate::analysis::{aggregate, DerivedView, ViewState};
use crate::models::{GroupSet, MetricKind, RawRow, SeriesTable, Subsystem};
use crate::source::FetchError;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Composite invalidation key of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    pub subsystem: Subsystem,
    pub metric: MetricKind,
}

impl Selection {
    pub fn new(subsystem: Subsystem, metric: MetricKind) -> Self {
        Self { subsystem, metric }
    }
}

/// Proof of which selection a fetch was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    selection: Selection,
    generation: u64,
}

impl FetchTicket {
    pub fn selection(&self) -> Selection {
        self.selection
    }
}

/// Aggregated data of a loaded chart.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedChart {
    pub groups: GroupSet,
    pub table: SeriesTable,
    pub rows_loaded: usize,
}

/// Lifecycle of one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartState {
    /// Nothing selected yet.
    Idle,
    Loading,
    /// The fetch failed; terminal until the selection is made again.
    Unavailable(String),
    /// Rows were fetched but none carry the selected metric.
    NoData,
    Ready(LoadedChart),
}

impl ChartState {
    /// Short status label for payloads and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ChartState::Idle => "idle",
            ChartState::Loading => "loading",
            ChartState::Unavailable(_) => "unavailable",
            ChartState::NoData => "no_data",
            ChartState::Ready(_) => "ready",
        }
    }
}

/// One chart's session.
#[derive(Debug, Clone)]
pub struct ChartSession {
    selection: Option<Selection>,
    generation: u64,
    state: ChartState,
    view: ViewState,
}

impl Default for ChartSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartSession {
    pub fn new() -> Self {
        Self {
            selection: None,
            generation: 0,
            state: ChartState::Idle,
            view: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ChartState {
        &self.state
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Start a new selection and return the ticket its fetch must carry.
    ///
    /// The view state is reset when the selection differs from the current
    /// one. Any fetch started before this call becomes stale.
    pub fn select(&mut self, selection: Selection) -> FetchTicket {
        if self.selection != Some(selection) {
            self.view = self.view.reset();
        }
        self.selection = Some(selection);
        self.generation += 1;
        self.state = ChartState::Loading;

        debug!(
            "Selected {} / {} (generation {})",
            selection.subsystem, selection.metric, self.generation
        );

        FetchTicket {
            selection,
            generation: self.generation,
        }
    }

    /// Whether a ticket still belongs to the current selection.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.generation == ticket.generation && self.selection == Some(ticket.selection)
    }

    /// Apply a fetch result. Returns `false` if the ticket was stale and the
    /// result was discarded.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<&[RawRow], &FetchError>,
    ) -> bool {
        if !self.is_current(&ticket) {
            debug!(
                "Discarding stale result for {} / {}",
                ticket.selection.subsystem, ticket.selection.metric
            );
            return false;
        }

        self.state = match result {
            Err(e) => {
                warn!(
                    "{} / {} unavailable: {}",
                    ticket.selection.subsystem, ticket.selection.metric, e
                );
                ChartState::Unavailable(e.to_string())
            }
            Ok(rows) => Self::build(rows, ticket.selection.metric),
        };
        true
    }

    fn build(rows: &[RawRow], metric: MetricKind) -> ChartState {
        let groups = GroupSet::from_rows(rows);
        let table = aggregate(rows, metric, &groups);

        if table.is_empty() {
            debug!("No usable {} rows", metric);
            return ChartState::NoData;
        }

        if let (Some(first), Some(last)) = (table.months().next(), table.months().last()) {
            info!(
                "Aggregated {} to {} monthly points ({} to {}) across {} groups",
                metric,
                table.len(),
                first,
                last,
                groups.len()
            );
        }

        ChartState::Ready(LoadedChart {
            groups,
            table,
            rows_loaded: rows.len(),
        })
    }

    /// Flip the hidden flag of a group.
    pub fn toggle(&mut self, group: &str) {
        self.view = self.view.toggle(group);
    }

    /// Hide a group, leaving it hidden if it already is.
    pub fn hide(&mut self, group: &str) {
        self.view = self.view.hide(group);
    }

    /// Set or clear the hovered group.
    pub fn set_hover(&mut self, group: Option<&str>) {
        self.view = self.view.with_hover(group);
    }

    /// Visible table and axis domain, once loaded.
    pub fn derived(&self) -> Option<DerivedView> {
        match &self.state {
            ChartState::Ready(chart) => Some(self.view.derive(&chart.table, &chart.groups)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_for(group: &str) -> Vec<RawRow> {
        vec![
            RawRow::single("2021-01-05", group, MetricKind::Entropy, 2.0),
            RawRow::single("2021-02-05", group, MetricKind::Entropy, 3.0),
        ]
    }

    fn groups_of(session: &ChartSession) -> Vec<String> {
        match session.state() {
            ChartState::Ready(chart) => chart.groups.iter().map(String::from).collect(),
            other => panic!("expected ready state, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_ready() {
        let mut session = ChartSession::new();
        let ticket = session.select(Selection::new(Subsystem::Consensus, MetricKind::Entropy));
        assert_eq!(session.state(), &ChartState::Loading);

        assert!(session.complete(ticket, Ok(&rows_for("Bitcoin"))));
        assert_eq!(groups_of(&session), vec!["Bitcoin"]);
        assert_eq!(session.derived().unwrap().table.len(), 2);
    }

    #[test]
    fn test_stale_fetch_discarded() {
        let mut session = ChartSession::new();
        let old = session.select(Selection::new(Subsystem::Consensus, MetricKind::Entropy));
        let new = session.select(Selection::new(Subsystem::Exchanges, MetricKind::Entropy));

        assert!(session.complete(new, Ok(&rows_for("Binance"))));
        assert!(!session.complete(old, Ok(&rows_for("Bitcoin"))));
        assert_eq!(groups_of(&session), vec!["Binance"]);
    }

    #[test]
    fn test_reselect_supersedes_pending_fetch() {
        let consensus = Selection::new(Subsystem::Consensus, MetricKind::Entropy);
        let exchanges = Selection::new(Subsystem::Exchanges, MetricKind::Entropy);
        let mut session = ChartSession::new();

        let first = session.select(consensus);
        assert!(session.complete(first, Ok(&rows_for("Bitcoin"))));

        let pending = session.select(exchanges);
        let again = session.select(consensus);
        assert!(session.complete(again, Ok(&rows_for("Ethereum"))));
        assert!(!session.complete(pending, Ok(&rows_for("Binance"))));

        assert!(session.is_current(&again));
        assert_eq!(groups_of(&session), vec!["Ethereum"]);
    }

    #[test]
    fn test_same_selection_old_ticket_is_stale() {
        let selection = Selection::new(Subsystem::Developers, MetricKind::Count);
        let mut session = ChartSession::new();
        let first = session.select(selection);
        let second = session.select(selection);

        assert!(!session.is_current(&first));
        assert!(session.is_current(&second));
        assert!(!session.complete(first, Err(&FetchError::InvalidSource("x".into()))));
        assert_eq!(session.state(), &ChartState::Loading);
    }

    #[test]
    fn test_fetch_failure_distinct_from_no_data() {
        let mut session = ChartSession::new();
        let ticket = session.select(Selection::new(Subsystem::DefiTvl, MetricKind::Gini));
        let err = FetchError::Status {
            url: "https://example.org/defi_tvl.csv".into(),
            status: 503,
        };
        session.complete(ticket, Err(&err));
        assert!(matches!(session.state(), ChartState::Unavailable(msg) if msg.contains("503")));

        let ticket = session.select(Selection::new(Subsystem::DefiTvl, MetricKind::Gini));
        session.complete(ticket, Ok(&rows_for("Aave")));
        assert_eq!(session.state(), &ChartState::NoData);
        assert!(session.derived().is_none());
    }

    #[test]
    fn test_view_reset_on_selection_change() {
        let mut session = ChartSession::new();
        let selection = Selection::new(Subsystem::Consensus, MetricKind::Entropy);
        let ticket = session.select(selection);
        session.complete(ticket, Ok(&rows_for("Bitcoin")));
        session.toggle("Bitcoin");
        session.set_hover(Some("Bitcoin"));

        // Same selection keeps the view.
        session.select(selection);
        assert!(session.view().is_hidden("Bitcoin"));

        session.select(Selection::new(Subsystem::Consensus, MetricKind::Gini));
        assert_eq!(session.view(), &ViewState::default());
    }

    #[test]
    fn test_hide_survives_repeats() {
        let mut session = ChartSession::new();
        let ticket = session.select(Selection::new(Subsystem::Consensus, MetricKind::Entropy));
        session.complete(ticket, Ok(&rows_for("Tron")));
        session.hide("Tron");
        session.hide("Tron");
        assert!(session.view().is_hidden("Tron"));
    }
}
