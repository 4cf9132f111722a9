//! Barvault CLI — manage locally stored historical price-bar datasets.
//!
//! Commands:
//! - `catalog` — browse stored series as an interval/exchange/symbol tree
//! - `import` — load bars from a delimited file (inline flags or a TOML config)
//! - `export` — write a date-bounded slice back to canonical CSV
//! - `show` — print a date-bounded slice as a table
//! - `delete` — remove a stored series
//! - `download` — fetch one series from the history provider
//! - `update` — refresh every stored series from the history provider

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use barvault_core::data::{
    download_series, update_all, BarStore, Catalog, ColumnMap, CsvStore, ExportPipeline,
    HistoryProvider, ImportConfig, ImportPipeline, ProviderError, StdoutProgress,
};
use barvault_core::domain::{BarRecord, Exchange, Interval, SeriesKey};

#[derive(Parser)]
#[command(name = "barvault", about = "Barvault CLI — historical bar data manager")]
struct Cli {
    /// Store root directory.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse stored series as an interval/exchange/symbol tree.
    Catalog,
    /// Import bars from a delimited text file.
    Import {
        /// Path to a TOML import config (mutually exclusive with inline flags).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Source file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Symbol, e.g. rb2410.
        #[arg(long)]
        symbol: Option<String>,

        /// Exchange, e.g. SHFE, NYSE.
        #[arg(long)]
        exchange: Option<String>,

        /// Interval: minute, hour, or daily.
        #[arg(long)]
        interval: Option<String>,

        /// IANA timezone naive timestamps are interpreted in.
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// strptime pattern for the datetime column.
        #[arg(long, default_value = "%Y-%m-%d %H:%M:%S")]
        format: String,

        /// Header names in the source file, where they differ from the
        /// canonical names.
        #[arg(long, default_value = "datetime")]
        col_datetime: String,
        #[arg(long, default_value = "open")]
        col_open: String,
        #[arg(long, default_value = "high")]
        col_high: String,
        #[arg(long, default_value = "low")]
        col_low: String,
        #[arg(long, default_value = "close")]
        col_close: String,
        #[arg(long, default_value = "volume")]
        col_volume: String,
        /// Turnover column; omit to default the field to zero.
        #[arg(long)]
        col_turnover: Option<String>,
        /// Open interest column; omit to default the field to zero.
        #[arg(long)]
        col_open_interest: Option<String>,
    },
    /// Export a date-bounded slice to canonical CSV.
    Export {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        interval: String,
        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD), inclusive (the whole day is exported).
        #[arg(long)]
        end: String,
        /// Destination file.
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a date-bounded slice as a table.
    Show {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        interval: String,
        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: String,
        /// Print at most this many rows.
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Delete a stored series.
    Delete {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        interval: String,
        /// Required confirmation; without it the command only previews.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Download one series from the history provider from a start date.
    Download {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        exchange: String,
        /// Interval: minute, hour, daily, or tick.
        #[arg(long)]
        interval: String,
        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: String,
    },
    /// Refresh every stored series from the history provider.
    Update,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = CsvStore::new(&cli.data_dir);

    match cli.command {
        Commands::Catalog => run_catalog(&store),
        Commands::Import {
            config,
            file,
            symbol,
            exchange,
            interval,
            timezone,
            format,
            col_datetime,
            col_open,
            col_high,
            col_low,
            col_close,
            col_volume,
            col_turnover,
            col_open_interest,
        } => {
            let import_config = match (config, file) {
                (Some(_), Some(_)) => bail!("--config and --file are mutually exclusive"),
                (None, None) => bail!("one of --config or --file is required"),
                (Some(path), None) => load_import_config(&path)?,
                (None, Some(file)) => ImportConfig {
                    file_path: file,
                    symbol: symbol.context("--symbol is required with --file")?,
                    exchange: parse_exchange(
                        &exchange.context("--exchange is required with --file")?,
                    )?,
                    interval: parse_interval(
                        &interval.context("--interval is required with --file")?,
                    )?,
                    source_timezone: parse_timezone(&timezone)?,
                    columns: ColumnMap {
                        datetime: col_datetime,
                        open: col_open,
                        high: col_high,
                        low: col_low,
                        close: col_close,
                        volume: col_volume,
                        turnover: col_turnover,
                        open_interest: col_open_interest,
                    },
                    timestamp_format: format,
                },
            };
            run_import(&store, &import_config)
        }
        Commands::Export {
            symbol,
            exchange,
            interval,
            start,
            end,
            out,
        } => run_export(
            &store,
            &series_key(&symbol, &exchange, &interval)?,
            date_range(&start, &end)?,
            &out,
        ),
        Commands::Show {
            symbol,
            exchange,
            interval,
            start,
            end,
            limit,
        } => run_show(
            &store,
            &series_key(&symbol, &exchange, &interval)?,
            date_range(&start, &end)?,
            limit,
        ),
        Commands::Delete {
            symbol,
            exchange,
            interval,
            yes,
        } => run_delete(&store, &series_key(&symbol, &exchange, &interval)?, yes),
        Commands::Download {
            symbol,
            exchange,
            interval,
            start,
        } => run_download(
            &store,
            &series_key(&symbol, &exchange, &interval)?,
            start_of_day(&start)?,
        ),
        Commands::Update => run_update(&store),
    }
}

// ── argument parsing helpers ────────────────────────────────────────

fn parse_exchange(raw: &str) -> Result<Exchange> {
    raw.parse::<Exchange>().map_err(|e| {
        let known: Vec<&str> = Exchange::ALL.iter().map(Exchange::as_str).collect();
        anyhow!("{e}; known venues: {}", known.join(", "))
    })
}

fn parse_interval(raw: &str) -> Result<Interval> {
    Ok(raw.parse::<Interval>()?)
}

fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.parse::<Tz>()
        .map_err(|e| anyhow!("unknown timezone '{raw}': {e}"))
}

fn series_key(symbol: &str, exchange: &str, interval: &str) -> Result<SeriesKey> {
    Ok(SeriesKey::new(
        symbol,
        parse_exchange(exchange)?,
        parse_interval(interval)?,
    ))
}

fn start_of_day(date: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{date}' (expected YYYY-MM-DD)"))?;
    Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()))
}

/// Inclusive date pair to a UTC `[start, end)` instant range: the end date's
/// whole day is included.
fn date_range(start: &str, end: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((
        start_of_day(start)?,
        start_of_day(end)? + chrono::Duration::days(1),
    ))
}

fn load_import_config(path: &PathBuf) -> Result<ImportConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read import config {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("invalid import config {}", path.display()))
}

// ── commands ────────────────────────────────────────────────────────

fn run_catalog(store: &CsvStore) -> Result<()> {
    let overviews = store.overviews()?;
    let catalog = Catalog::build(&overviews);

    for node in &catalog.intervals {
        println!("{}", node.interval);
        for group in &node.exchanges {
            println!("  {}", group.exchange);
            for series in &group.series {
                println!(
                    "    {:<16} {:>8} bars  {}  {}",
                    series.key.vt_symbol(),
                    series.count,
                    series.start.format("%Y-%m-%d %H:%M:%S"),
                    series.end.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }
    }
    println!("\n{} series total", catalog.total_series());
    Ok(())
}

fn run_import(store: &CsvStore, config: &ImportConfig) -> Result<()> {
    let report = ImportPipeline::new(store).run(config, &AtomicBool::new(false))?;

    println!("Imported {}", config.key());
    println!("  start: {}", report.start.format("%Y-%m-%d %H:%M:%S"));
    println!("  end:   {}", report.end.format("%Y-%m-%d %H:%M:%S"));
    println!("  count: {}", report.count);
    Ok(())
}

fn run_export(
    store: &CsvStore,
    key: &SeriesKey,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
    out: &std::path::Path,
) -> Result<()> {
    let written =
        ExportPipeline::new(store).write_csv(key, start, end, out, &AtomicBool::new(false))?;
    println!("Exported {written} rows of {key} to {}", out.display());
    Ok(())
}

fn run_show(
    store: &CsvStore,
    key: &SeriesKey,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
    limit: usize,
) -> Result<()> {
    let bars = store.query(key, start, end)?;
    let shown = bars.len().min(limit);

    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14} {:>14}",
        "datetime", "open", "high", "low", "close", "volume", "turnover", "open_interest"
    );
    for bar in bars.iter().take(limit) {
        print_bar_row(bar);
    }
    if shown < bars.len() {
        println!("... {} more rows (raise --limit)", bars.len() - shown);
    }
    println!("\n{} rows of {key}", bars.len());
    Ok(())
}

fn print_bar_row(bar: &BarRecord) {
    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14} {:>14}",
        bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        bar.open,
        bar.high,
        bar.low,
        bar.close,
        bar.volume,
        bar.turnover,
        bar.open_interest,
    );
}

fn run_delete(store: &CsvStore, key: &SeriesKey, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to delete {key} without --yes");
    }
    let count = store.delete(key)?;
    println!("Deleted {count} records of {key}");
    Ok(())
}

fn run_download(store: &CsvStore, key: &SeriesKey, start: DateTime<Utc>) -> Result<()> {
    let provider = UnconfiguredProvider;
    println!(
        "Downloading {key} from {} via {}...",
        start.format("%Y-%m-%d"),
        provider.name()
    );
    let written = download_series(store, &provider, key, start)?;
    println!("{written} records written for {key}");
    Ok(())
}

fn run_update(store: &CsvStore) -> Result<()> {
    let provider = UnconfiguredProvider;
    let summary = update_all(store, &provider, &StdoutProgress, &AtomicBool::new(false))?;

    if !summary.all_succeeded() {
        for (key, err) in &summary.errors {
            eprintln!("Error for {key}: {err}");
        }
        std::process::exit(1);
    }
    println!("{} bars written", summary.bars_written);
    Ok(())
}

/// Placeholder provider: barvault ships without a network datafeed, so every
/// refresh reports what it would have fetched and fails cleanly.
struct UnconfiguredProvider;

impl HistoryProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn download_bar_data(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
    ) -> Result<Vec<BarRecord>, ProviderError> {
        Err(ProviderError::Unavailable(format!(
            "no datafeed configured (would fetch {key} from {})",
            start.format("%Y-%m-%d %H:%M:%S")
        )))
    }

    fn download_tick_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        _start: DateTime<Utc>,
    ) -> Result<usize, ProviderError> {
        Err(ProviderError::Unavailable(format!(
            "no datafeed configured for ticks of {symbol}.{exchange}"
        )))
    }
}
