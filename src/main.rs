//! decentscope - Crypto decentralization dashboard data engine
//!
//! A CLI tool that loads per-day decentralization metric snapshots for
//! crypto subsystems, aggregates them into monthly per-entity series and
//! writes chart-ready JSON or a Markdown report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, unwritable output, etc.)
//!   2 - A chart could not be loaded and --fail-on-unavailable is set

mod analysis;
mod cli;
mod config;
mod dashboard;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use dashboard::{ChartState, Dashboard};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use models::{GroupSet, MetricKind, Subsystem};
use report::{MarkdownOptions, Report, SubsystemReport};
use source::DataSource;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load config before logging so `[general] verbose` can raise the level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("decentscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Config: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .decentscope.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to choose the data source, metrics, hidden groups and report format.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load every requested subsystem and write the report. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let source = build_source(&config)?;
    let subsystems = args.subsystems();
    let metrics = config.chart.metrics.clone();

    println!("📥 Loading {} subsystem(s) from {}", subsystems.len(), source.describe());

    if args.dry_run {
        return handle_dry_run(&source, &subsystems).await;
    }

    println!(
        "📈 Metrics: {}",
        metrics
            .iter()
            .map(|m| m.column_name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let dashboards = load_dashboards(&source, &subsystems, &metrics, &config, args.quiet).await;

    let subsystem_reports: Vec<SubsystemReport> = dashboards
        .iter()
        .map(|(subsystem, dashboard)| {
            SubsystemReport::from_dashboard(*subsystem, source.location(*subsystem), dashboard)
        })
        .collect();

    let duration = start_time.elapsed().as_secs_f64();
    let report = Report::new(source.describe(), subsystem_reports, duration);

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(
            &report,
            MarkdownOptions {
                include_table: config.report.include_table,
                precision: config.report.precision,
            },
        ),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Summary:");
    for (subsystem, dashboard) in &dashboards {
        println!(
            "   {}: {} rows",
            subsystem.label(),
            SubsystemReport::rows_loaded(dashboard)
        );
        for &metric in &metrics {
            if let Some(session) = dashboard.chart(metric) {
                println!("     {} {}", status_marker(session.state()), metric.title());
            }
        }
    }
    println!(
        "   Charts: {} ready | {} without data | {} unavailable",
        report.metadata.charts_ready,
        report.metadata.charts_no_data,
        report.metadata.charts_unavailable
    );
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report saved to: {}", output_path.display());

    let any_unavailable = dashboards.iter().any(|(_, d)| d.has_unavailable());
    if args.fail_on_unavailable && any_unavailable {
        eprintln!("\n⛔ Some charts could not be loaded. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Fetch subsystems concurrently, one dashboard each, in the requested order.
async fn load_dashboards(
    source: &DataSource,
    subsystems: &[Subsystem],
    metrics: &[MetricKind],
    config: &Config,
    quiet: bool,
) -> Vec<(Subsystem, Dashboard)> {
    let progress = progress_bar(subsystems.len(), quiet);
    let concurrency = config.general.concurrency.max(1);

    let jobs = stream::iter(subsystems.iter().copied().enumerate());
    let mut loaded: Vec<(usize, Subsystem, Dashboard)> = jobs
        .map(|(index, subsystem)| {
            let progress = progress.clone();
            async move {
                let mut dashboard = Dashboard::new(metrics);
                dashboard.load(source, subsystem).await;

                // Selecting a subsystem resets the view, so apply it afterwards.
                dashboard.apply_view(&config.chart.hidden, config.chart.hovered.as_deref());

                if let Some(pb) = progress {
                    pb.inc(1);
                    pb.set_message(subsystem.label());
                }
                (index, subsystem, dashboard)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    loaded.sort_by_key(|(index, _, _)| *index);
    loaded
        .into_iter()
        .map(|(_, subsystem, dashboard)| (subsystem, dashboard))
        .collect()
}

fn progress_bar(len: usize, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn status_marker(state: &ChartState) -> &'static str {
    match state {
        ChartState::Ready(_) => "🟢",
        ChartState::NoData => "⚪",
        ChartState::Unavailable(_) => "🔴",
        ChartState::Idle | ChartState::Loading => "⏳",
    }
}

/// Handle --dry-run: fetch snapshots and list their groups, no report.
async fn handle_dry_run(source: &DataSource, subsystems: &[Subsystem]) -> Result<i32> {
    println!("\n🔍 Dry run: fetching snapshots (no report)...\n");

    for &subsystem in subsystems {
        match source.fetch(subsystem).await {
            Ok(rows) => {
                let groups = GroupSet::from_rows(&rows);
                println!(
                    "   📄 {} ({} rows, {} groups)",
                    source.location(subsystem),
                    rows.len(),
                    groups.len()
                );
                for metric in MetricKind::ALL {
                    println!(
                        "       {:<9} {} usable rows",
                        metric.column_name(),
                        analysis::usable_rows(&rows, metric)
                    );
                }
                if !groups.is_empty() {
                    println!("       Groups: {}", groups.iter().collect::<Vec<_>>().join(", "));
                }
            }
            Err(e) => {
                println!("   ❌ {}: {}", subsystem.label(), e);
            }
        }
    }

    println!("\n✅ Dry run complete. No report was written.");
    Ok(0)
}

/// Build the raw-row source from configuration.
fn build_source(config: &Config) -> Result<DataSource> {
    match config.source.base_url {
        Some(ref url) => {
            info!("Using remote snapshots at {}", url);
            DataSource::remote(url, Duration::from_secs(config.source.timeout_seconds))
                .context("Failed to set up remote data source")
        }
        None => {
            info!("Using local snapshots in {}", config.source.data_dir);
            Ok(DataSource::local(&config.source.data_dir))
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", config::CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
