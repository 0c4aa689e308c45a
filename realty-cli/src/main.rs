//! Realty CLI: browse, compare, fetch and export real-estate indices.
//!
//! Commands:
//! - `sources`: list the configured acquisition sources
//! - `indices`: list index names with their date coverage
//! - `fetch`: run the fetcher over the registry and optionally save CSV
//! - `summary`: percent change per index over a date range
//! - `correlation`: correlation matrix between indices
//! - `normalize`: rebase indices to 100 at the range start
//! - `export`: write the (filtered) table as CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use realty_core::calendar::business_days_only;
use realty_core::config::{AppConfig, TransportKind};
use realty_core::domain::{IndexSeries, IndexTable};
use realty_core::fetch::{FetchError, LogProgress, SourceRegistry, StrategyKind};
use realty_core::store::{
    compute_change_summary, compute_correlation, compute_normalized, filter_by_date_range,
    to_csv_string, write_csv_file, FixedTable, IndexDataStore, SampleDataset,
};

#[derive(Parser)]
#[command(
    name = "realty",
    about = "Realty CLI: real-estate index comparison and acquisition"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to a TOML file of `[[sources]]` entries. Replaces the configured
    /// sources.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured acquisition sources.
    Sources,
    /// List index names and their date coverage.
    Indices {
        #[arg(long, value_enum, default_value_t = DataSource::Sample)]
        source: DataSource,
    },
    /// Fetch indices from their sources.
    Fetch {
        /// Only fetch these sources (repeatable). Defaults to all.
        #[arg(long = "index")]
        indices: Vec<String>,

        /// Override the courtesy delay between requests.
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Use live HTTP requests instead of the synthetic transport.
        #[arg(long, default_value_t = false)]
        http: bool,

        /// Drop weekend observations from poll sources.
        #[arg(long, default_value_t = false)]
        business_days: bool,

        /// Write the fetched table as CSV.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Percent change per index between the first and last in-range value.
    Summary(Selection),
    /// Correlation matrix between indices.
    Correlation(Selection),
    /// Rebase indices to 100 at the start of the range.
    Normalize {
        #[command(flatten)]
        selection: Selection,

        /// Write the normalized table as CSV instead of printing it.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export the table (filtered to the range) as CSV.
    Export {
        #[command(flatten)]
        selection: Selection,

        /// Output file. Prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DataSource {
    /// Built-in sample dataset.
    Sample,
    /// Fetch every configured source first.
    Fetch,
}

#[derive(Args)]
struct Selection {
    /// Where the table comes from.
    #[arg(long, value_enum, default_value_t = DataSource::Sample)]
    source: DataSource,

    /// Indices to include (repeatable). Defaults to the first two for
    /// comparisons and all indices for export.
    #[arg(long = "index")]
    indices: Vec<String>,

    /// Start date (YYYY-MM-DD). Defaults to the first date in the table.
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to the last date in the table.
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,realty=info,realty_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(path) = &cli.registry {
        let registry = SourceRegistry::from_file(path)
            .with_context(|| format!("loading registry {}", path.display()))?;
        config.sources = registry.sources().to_vec();
    }

    match cli.command {
        Commands::Sources => run_sources(&config),
        Commands::Indices { source } => run_indices(&config, source),
        Commands::Fetch {
            indices,
            pacing_ms,
            http,
            business_days,
            out,
        } => run_fetch(&config, &indices, pacing_ms, http, business_days, out.as_deref()),
        Commands::Summary(selection) => run_summary(&config, &selection),
        Commands::Correlation(selection) => run_correlation(&config, &selection),
        Commands::Normalize { selection, out } => run_normalize(&config, &selection, out.as_deref()),
        Commands::Export { selection, out } => run_export(&config, &selection, out.as_deref()),
    }
}

fn run_sources(config: &AppConfig) -> Result<()> {
    let registry = config.registry()?;
    println!("{} sources (fingerprint {})", registry.len(), registry.fingerprint().short());
    for source in registry.sources() {
        println!(
            "  {:<32} {:<9} {:<10} {}",
            source.name,
            source.strategy,
            source.update_frequency.as_deref().unwrap_or("-"),
            source.endpoint
        );
        for (key, value) in &source.strategy_params {
            println!("      {key} = {value}");
        }
    }
    Ok(())
}

fn run_indices(config: &AppConfig, source: DataSource) -> Result<()> {
    let table = load_table(config, source)?;
    for series in table.series() {
        match (series.first(), series.last()) {
            (Some(first), Some(last)) => println!(
                "{:<32} {:>5} points  {} .. {}",
                series.name(),
                series.len(),
                first.date,
                last.date
            ),
            _ => println!("{:<32} (no observations)", series.name()),
        }
    }
    Ok(())
}

fn run_fetch(
    config: &AppConfig,
    indices: &[String],
    pacing_ms: Option<u64>,
    http: bool,
    business_days: bool,
    out: Option<&Path>,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(ms) = pacing_ms {
        config.fetch.pacing_ms = ms;
    }
    if http {
        config.fetch.transport = TransportKind::Http;
    }

    let fetcher = config.build_fetcher()?;
    let names: Vec<&str> = if indices.is_empty() {
        fetcher.registry().names()
    } else {
        indices.iter().map(String::as_str).collect()
    };

    let summary = fetcher.fetch_selected(&names, &LogProgress);

    let series: Vec<IndexSeries> = summary
        .table
        .series()
        .iter()
        .map(|s| {
            let is_poll = fetcher
                .registry()
                .get(s.name())
                .and_then(|d| StrategyKind::parse(&d.strategy))
                == Some(StrategyKind::Poll);
            if business_days && is_poll {
                business_days_only(s)
            } else {
                s.clone()
            }
        })
        .collect();
    let table = IndexTable::new(series)?;

    for series in table.series() {
        println!("{:<32} {:>5} points", series.name(), series.len());
    }
    if let Some(at) = fetcher.last_updated(None) {
        println!("last updated {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if let Some(path) = out {
        write_csv_file(&table, path)?;
        info!(path = %path.display(), "wrote fetched table");
    }

    if !summary.all_succeeded() {
        for (name, err) in &summary.errors {
            eprintln!("Error for {name} ({}): {err}", failure_kind(err));
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_summary(config: &AppConfig, selection: &Selection) -> Result<()> {
    let table = load_table(config, selection.source)?;
    let names = selected_names(&table, selection, 2);
    let (start, end) = resolve_range(&table, selection)?;

    let report = compute_change_summary(&table, &names, start, end)?;
    println!("{start} .. {end}");
    for s in &report.summaries {
        println!(
            "  {:<32} {:>10.2} -> {:>10.2}  {:>+8.2}%",
            s.index, s.start_value, s.end_value, s.percent_change
        );
    }
    for (name, err) in &report.failures {
        println!("  {name:<32} unavailable: {err}");
    }
    Ok(())
}

fn run_correlation(config: &AppConfig, selection: &Selection) -> Result<()> {
    let table = load_table(config, selection.source)?;
    let names = selected_names(&table, selection, 2);
    let (start, end) = resolve_range(&table, selection)?;

    let matrix = compute_correlation(&table, &names, start, end)?;
    println!("{start} .. {end} ({} shared dates)", matrix.overlap);
    for (name, row) in matrix.names.iter().zip(&matrix.values) {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>6.3}")).collect();
        println!("  {name:<32} {}", cells.join(" "));
    }
    Ok(())
}

fn run_normalize(config: &AppConfig, selection: &Selection, out: Option<&Path>) -> Result<()> {
    let table = load_table(config, selection.source)?;
    let names = selected_names(&table, selection, 2);
    let (start, end) = resolve_range(&table, selection)?;

    let report = compute_normalized(&table, &names, start, end)?;
    for (name, err) in &report.failures {
        warn!(index = %name, error = %err, "index left out of normalized table");
    }

    match out {
        Some(path) => write_csv_file(&report.table, path)?,
        None => print!("{}", to_csv_string(&report.table)?),
    }
    Ok(())
}

fn run_export(config: &AppConfig, selection: &Selection, out: Option<&Path>) -> Result<()> {
    let table = load_table(config, selection.source)?;
    let names = selected_names(&table, selection, usize::MAX);
    let (start, end) = resolve_range(&table, selection)?;

    let filtered = filter_by_date_range(&table.select(&names), start, end)?;
    match out {
        Some(path) => {
            write_csv_file(&filtered, path)?;
            info!(path = %path.display(), indices = filtered.len(), "exported table");
        }
        None => print!("{}", to_csv_string(&filtered)?),
    }
    Ok(())
}

/// Load the table through an `IndexDataStore`.
fn load_table(config: &AppConfig, source: DataSource) -> Result<Arc<IndexTable>> {
    let store = match source {
        DataSource::Sample => IndexDataStore::new(SampleDataset::new(config.sample.clone())),
        DataSource::Fetch => {
            let fetcher = config.build_fetcher()?;
            let summary = fetcher.fetch_all_with_progress(&LogProgress);
            for (name, err) in &summary.errors {
                warn!(source = %name, error = %err, "source skipped");
            }
            IndexDataStore::new(FixedTable::new(summary.table))
        }
    };
    Ok(store.load()?)
}

/// Configuration failures need an edited registry; the rest may clear on a
/// later run.
fn failure_kind(err: &FetchError) -> &'static str {
    if err.is_configuration() {
        "configuration"
    } else {
        "transient"
    }
}

/// Requested names, or the first `default_count` indices of the table.
fn selected_names<'a>(
    table: &'a IndexTable,
    selection: &'a Selection,
    default_count: usize,
) -> Vec<&'a str> {
    if selection.indices.is_empty() {
        table.names().into_iter().take(default_count).collect()
    } else {
        selection.indices.iter().map(String::as_str).collect()
    }
}

/// Explicit range, falling back to the table's own bounds.
fn resolve_range(table: &IndexTable, selection: &Selection) -> Result<(NaiveDate, NaiveDate)> {
    let Some((first, last)) = table.date_bounds() else {
        bail!("table has no observations");
    };
    Ok((selection.start.unwrap_or(first), selection.end.unwrap_or(last)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_selection_flags() {
        let cli = Cli::try_parse_from([
            "realty",
            "summary",
            "--index",
            "J-REIT Index",
            "--start",
            "2020-01-01",
        ])
        .unwrap();
        match cli.command {
            Commands::Summary(sel) => {
                assert_eq!(sel.indices, vec!["J-REIT Index".to_string()]);
                assert_eq!(sel.start, NaiveDate::from_ymd_opt(2020, 1, 1));
                assert!(sel.end.is_none());
            }
            _ => panic!("expected summary"),
        }
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(Cli::try_parse_from(["realty", "export", "--start", "01/02/2020"]).is_err());
    }

    #[test]
    fn parses_global_registry_flag() {
        let cli =
            Cli::try_parse_from(["realty", "sources", "--registry", "sources.toml"]).unwrap();
        assert_eq!(cli.registry, Some(PathBuf::from("sources.toml")));
    }

    #[test]
    fn classifies_fetch_failures() {
        assert_eq!(
            failure_kind(&FetchError::UnknownSource("rent".into())),
            "configuration"
        );
        assert_eq!(
            failure_kind(&FetchError::Transport("HTTP 503 for rent".into())),
            "transient"
        );
    }

    #[test]
    fn default_pacing_comes_from_config() {
        assert_eq!(AppConfig::default().pacing(), Duration::from_secs(1));
    }
}
