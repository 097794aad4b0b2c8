//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{MetricKind, Subsystem};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// decentscope - monthly decentralization metrics for crypto subsystems
///
/// Loads per-day metric snapshots (one CSV per subsystem), aggregates them
/// into monthly series per entity and writes chart-ready JSON or a
/// Markdown report.
///
/// Examples:
///   decentscope --data-dir ./data
///   decentscope --subsystem exchanges,defi_tvl --metric gini,hhi --format json
///   decentscope --all-subsystems --hide Tron --hover Bitcoin
///   decentscope --base-url "https://storage.example.com/o/{file}?alt=media"
///   decentscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subsystems to load (comma-separated)
    #[arg(
        short,
        long,
        value_name = "SUBSYSTEMS",
        value_delimiter = ',',
        default_value = "consensus",
        conflicts_with = "all_subsystems"
    )]
    pub subsystem: Vec<Subsystem>,

    /// Load every subsystem
    #[arg(long)]
    pub all_subsystems: bool,

    /// Metrics to chart (comma-separated); defaults to all five
    #[arg(short, long, value_name = "METRICS", value_delimiter = ',')]
    pub metric: Option<Vec<MetricKind>>,

    /// Directory holding <subsystem>.csv snapshots
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of remote snapshots
    ///
    /// Either a prefix the file name is appended to, or a URL containing a
    /// {file} placeholder.
    #[arg(long, value_name = "URL", env = "DECENTSCOPE_BASE_URL")]
    pub base_url: Option<String>,

    /// Groups to hide on every chart (comma-separated)
    #[arg(long, value_name = "GROUPS", value_delimiter = ',')]
    pub hide: Option<Vec<String>>,

    /// Group to emphasise on every chart
    #[arg(long, value_name = "GROUP")]
    pub hover: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .decentscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds for remote snapshots
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of subsystems fetched concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: fetch snapshots and list groups without writing a report
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 if any chart could not be loaded
    #[arg(long)]
    pub fail_on_unavailable: bool,

    /// Generate a default .decentscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.is_dir() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if matches!(self.metric, Some(ref metrics) if metrics.is_empty()) {
            return Err("At least one metric is required".to_string());
        }

        if let Some(ref hover) = self.hover {
            if hover.trim().is_empty() {
                return Err("Hovered group must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Subsystems to load, deduplicated, in the order given.
    pub fn subsystems(&self) -> Vec<Subsystem> {
        if self.all_subsystems {
            return Subsystem::ALL.to_vec();
        }
        let mut subsystems = Vec::new();
        for &subsystem in &self.subsystem {
            if !subsystems.contains(&subsystem) {
                subsystems.push(subsystem);
            }
        }
        subsystems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            subsystem: vec![Subsystem::Consensus],
            all_subsystems: false,
            metric: None,
            data_dir: None,
            base_url: None,
            hide: None,
            hover: None,
            output: None,
            format: None,
            config: None,
            timeout: None,
            concurrency: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            fail_on_unavailable: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_lists() {
        let args = Args::try_parse_from([
            "decentscope",
            "--subsystem",
            "defi_gov,exchanges",
            "--metric",
            "hhi,count",
            "--hide",
            "Tron,TON",
        ])
        .unwrap();

        assert_eq!(args.subsystem, vec![Subsystem::DefiGov, Subsystem::Exchanges]);
        assert_eq!(args.metric, Some(vec![MetricKind::Hhi, MetricKind::Count]));
        assert_eq!(args.hide, Some(vec!["Tron".to_string(), "TON".to_string()]));
    }

    #[test]
    fn test_all_subsystems() {
        let mut args = make_args();
        args.all_subsystems = true;
        assert_eq!(args.subsystems().len(), 6);
    }

    #[test]
    fn test_subsystems_deduplicated() {
        let mut args = make_args();
        args.subsystem = vec![Subsystem::Exchanges, Subsystem::Consensus, Subsystem::Exchanges];
        assert_eq!(
            args.subsystems(),
            vec![Subsystem::Exchanges, Subsystem::Consensus]
        );
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.base_url = Some("storage.example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_concurrency() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());
    }
}
