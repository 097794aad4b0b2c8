//! Aggregation and chart-state engine.
//!
//! Raw rows are bucketed into monthly series by the aggregator; the view
//! module derives what a chart actually shows from hidden and hovered lines.

pub mod aggregator;
pub mod palette;
pub mod view;

pub use aggregator::*;
pub use palette::*;
pub use view::*;
