//! macrolab CLI: fetch the aligned macro/market dataset.
//!
//! Commands:
//! - `fetch`: pull FRED series and Yahoo index closes, align them, print a summary
//! - `config`: print the default dataset configuration as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use macrolab_core::data::{FredProvider, YahooProvider};
use macrolab_core::export::{content_hash, write_table};
use macrolab_core::pipeline::{build_dataset, MacroDataset, SourceKind};
use macrolab_core::DatasetConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "macrolab",
    about = "macrolab CLI: macro indicators and index closes on one daily axis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, align and summarize the dataset.
    Fetch {
        /// First calendar year (overrides the config). Defaults to 2000.
        #[arg(long)]
        start_year: Option<i32>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Path to a TOML dataset config. Defaults to the built-in series set.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the aligned table here (.csv or .parquet).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Number of trailing rows to print.
        #[arg(long, default_value_t = 5)]
        tail: usize,
    },
    /// Print the default dataset configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            start_year,
            end,
            config,
            output,
            tail,
        } => run_fetch(start_year, end, config, output, tail),
        Commands::Config => {
            print!("{}", DatasetConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn run_fetch(
    start_year: Option<i32>,
    end: Option<String>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    tail: usize,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => DatasetConfig::load(path)?,
        None => DatasetConfig::default(),
    };
    if let Some(year) = start_year {
        config.start_year = year;
    }

    let end_date = parse_end(end.as_deref())?;

    let fred = FredProvider::new(&config.fred)?;
    let yahoo = YahooProvider::new(&config.yahoo)?;

    let dataset = build_dataset(&fred, &yahoo, &config, end_date)?;
    if dataset.table.is_empty() {
        bail!(
            "no complete rows in {}: every column needs at least one observation",
            dataset.range
        );
    }

    print_summary(&dataset);
    print_tail(&dataset, tail);

    if let Some(path) = output {
        let format = write_table(dataset.table.table(), &path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("\nWrote {} rows to {} ({format:?})", dataset.table.len(), path.display());
    }

    Ok(())
}

fn parse_end(end: Option<&str>) -> Result<NaiveDate> {
    match end {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --end '{s}', expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn print_summary(dataset: &MacroDataset) {
    let table = &dataset.table;
    let stats = table.stats();

    println!("Range:       {}", dataset.range);
    println!(
        "Rows:        {} ({} merged, {} dropped as incomplete)",
        table.len(),
        stats.merged_rows,
        stats.dropped_rows
    );
    println!(
        "Dates:       {} .. {}",
        table.dates()[0],
        table.dates()[table.len() - 1]
    );
    println!("Fingerprint: {}", content_hash(table.table()));
    println!("\nColumns:");
    for p in &dataset.provenance {
        let kind = match p.kind {
            SourceKind::Macro => "macro",
            SourceKind::Market => "market",
        };
        println!("  {:<14} {:<7} {} {}", p.column, kind, p.provider, p.code);
    }
}

fn print_tail(dataset: &MacroDataset, n: usize) {
    if n == 0 {
        return;
    }
    let table = &dataset.table;

    print!("\n{:<10}", "date");
    for name in table.columns() {
        print!(" {:>12}", truncate(name, 12));
    }
    println!();

    let start = table.len().saturating_sub(n);
    for i in start..table.len() {
        print!("{}", table.dates()[i]);
        for cell in table.row(i).unwrap_or_default() {
            match cell {
                Some(v) => print!(" {v:>12.2}"),
                None => print!(" {:>12}", "-"),
            }
        }
        println!();
    }
}

fn truncate(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
