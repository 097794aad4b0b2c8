//! Report generation modules.
//!
//! This module turns loaded dashboards into renderer payloads and
//! JSON/Markdown reports.

pub mod generator;
pub mod payload;

pub use generator::*;
pub use payload::*;
