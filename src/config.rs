//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.decentscope.toml` files.

use crate::cli::OutputFormat;
use crate::models::MetricKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".decentscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Raw-row source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Chart selection and view settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of subsystems fetched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "decentscope_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Where snapshots are loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding `<subsystem>.csv` files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Remote base URL; takes precedence over `data_dir` when set.
    /// May contain a `{file}` placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            base_url: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Which charts to build and how they start out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Metrics to chart, in order.
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricKind>,

    /// Groups hidden on every chart.
    #[serde(default)]
    pub hidden: Vec<String>,

    /// Group to emphasise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hovered: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            metrics: default_metrics(),
            hidden: Vec::new(),
            hovered: None,
        }
    }
}

fn default_metrics() -> Vec<MetricKind> {
    MetricKind::ALL.to_vec()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Include month-by-group data tables in Markdown reports.
    #[serde(default = "default_true")]
    pub include_table: bool,

    /// Decimal places for values in Markdown reports.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_table: true,
            precision: default_precision(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_precision() -> usize {
    3
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref url) = args.base_url {
            self.source.base_url = Some(url.clone());
        }
        // An explicit directory wins over any URL, including one from the environment.
        if let Some(ref dir) = args.data_dir {
            self.source.data_dir = dir.display().to_string();
            self.source.base_url = None;
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        if let Some(ref metrics) = args.metric {
            self.chart.metrics = metrics.clone();
        }
        if let Some(ref hidden) = args.hide {
            self.chart.hidden = hidden.clone();
        }
        if let Some(ref hover) = args.hover {
            self.chart.hovered = Some(hover.clone());
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
    }

    /// Log level after merging: `quiet` wins, then `verbose`, else INFO.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
