//! Dashboard of metric charts for one subsystem.
//!
//! Every metric chart shares the subsystem's snapshot, so a subsystem is
//! fetched once and the result is handed to each chart session.

pub mod session;

pub use session::{ChartSession, ChartState, FetchTicket, Selection};

use crate::models::{MetricKind, RawRow, Subsystem};
use crate::source::{DataSource, FetchError};
use tracing::info;

/// Tickets issued for one subsystem selection, one per metric chart.
#[derive(Debug, Clone)]
pub struct DashboardTicket {
    tickets: Vec<FetchTicket>,
}

/// One chart per metric, all showing the same subsystem.
#[derive(Debug, Clone)]
pub struct Dashboard {
    charts: Vec<(MetricKind, ChartSession)>,
}

impl Dashboard {
    /// Create a dashboard for the given metrics, deduplicated, in order.
    pub fn new(metrics: &[MetricKind]) -> Self {
        let mut charts: Vec<(MetricKind, ChartSession)> = Vec::new();
        for &metric in metrics {
            if !charts.iter().any(|(m, _)| *m == metric) {
                charts.push((metric, ChartSession::new()));
            }
        }
        Self { charts }
    }

    pub fn charts(&self) -> impl Iterator<Item = (MetricKind, &ChartSession)> + '_ {
        self.charts.iter().map(|(metric, session)| (*metric, session))
    }

    pub fn chart(&self, metric: MetricKind) -> Option<&ChartSession> {
        self.charts
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, session)| session)
    }

    /// Switch every chart to a subsystem.
    pub fn select_subsystem(&mut self, subsystem: Subsystem) -> DashboardTicket {
        let tickets = self
            .charts
            .iter_mut()
            .map(|(metric, session)| session.select(Selection::new(subsystem, *metric)))
            .collect();
        DashboardTicket { tickets }
    }

    /// Hand one fetch result to every chart. Returns how many charts
    /// accepted it.
    pub fn complete(
        &mut self,
        ticket: DashboardTicket,
        result: Result<Vec<RawRow>, FetchError>,
    ) -> usize {
        let result = result.as_ref().map(Vec::as_slice);
        let mut applied = 0;
        for chart_ticket in ticket.tickets {
            let metric = chart_ticket.selection().metric;
            if let Some((_, session)) = self.charts.iter_mut().find(|(m, _)| *m == metric) {
                if session.complete(chart_ticket, result) {
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Fetch a subsystem once and load every chart from it.
    pub async fn load(&mut self, source: &DataSource, subsystem: Subsystem) -> usize {
        let ticket = self.select_subsystem(subsystem);
        let result = source.fetch(subsystem).await;
        let applied = self.complete(ticket, result);
        info!("Loaded {} charts for {}", applied, subsystem);
        applied
    }

    /// Hide or show a group on every chart.
    #[allow(dead_code)] // Interactive toggling; the CLI applies whole views
    pub fn toggle(&mut self, group: &str) {
        for (_, session) in &mut self.charts {
            session.toggle(group);
        }
    }

    /// Apply a configured view: hide every listed group and set the hover.
    ///
    /// The list is treated as a set, so repeated names stay hidden.
    pub fn apply_view(&mut self, hidden: &[String], hovered: Option<&str>) {
        for group in hidden {
            self.hide(group);
        }
        self.set_hover(hovered);
    }

    /// Hide a group on every chart.
    pub fn hide(&mut self, group: &str) {
        for (_, session) in &mut self.charts {
            session.hide(group);
        }
    }

    /// Set or clear hover focus on every chart.
    pub fn set_hover(&mut self, group: Option<&str>) {
        for (_, session) in &mut self.charts {
            session.set_hover(group);
        }
    }

    /// Whether any chart failed to load.
    pub fn has_unavailable(&self) -> bool {
        self.charts
            .iter()
            .any(|(_, s)| matches!(s.state(), ChartState::Unavailable(_)))
    }
}
