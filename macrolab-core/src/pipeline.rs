//! End-to-end dataset collection.
//!
//! Fetch macro series, then market prices, rename both to semantic column
//! names, and align them into one gap-free daily table. Fetches run one
//! after the other; the first failure ends the run with no partial result.

use crate::config::{ConfigError, DatasetConfig};
use crate::data::{
    align, AlignedTable, ColumnMapping, DateRange, FetchError, MacroSource, MarketSource,
    RangeError, TableError,
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("macro fetch from {provider} failed: {source}")]
    MacroFetch {
        provider: String,
        #[source]
        source: FetchError,
    },

    #[error("market fetch from {provider} failed: {source}")]
    MarketFetch {
        provider: String,
        #[source]
        source: FetchError,
    },

    #[error("alignment failed: {0}")]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid date range: {0}")]
    Range(#[from] RangeError),
}

/// Which side of the join a column came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Macro,
    Market,
}

/// Where an output column came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProvenance {
    pub column: String,
    pub kind: SourceKind,
    pub provider: String,
    pub code: String,
}

/// The aligned dataset plus the context it was built in.
#[derive(Debug, Clone)]
pub struct MacroDataset {
    pub table: AlignedTable,
    pub range: DateRange,
    pub provenance: Vec<ColumnProvenance>,
}

/// Fetch both sources over `config.start_year ..= end` and align them.
pub fn build_dataset(
    macro_source: &dyn MacroSource,
    market_source: &dyn MarketSource,
    config: &DatasetConfig,
    end: NaiveDate,
) -> Result<MacroDataset, PipelineError> {
    config.validate()?;
    let range = DateRange::from_start_year(config.start_year, end)?;
    let macro_mapping = config.macro_mapping()?;
    let market_mapping = config.market_mapping()?;

    info!(%range, "starting data collection");

    let macro_table = macro_source
        .fetch_series(&macro_mapping.sources(), range)
        .map_err(|source| {
            error!(provider = macro_source.name(), %source, "macro fetch failed");
            PipelineError::MacroFetch {
                provider: macro_source.name().to_string(),
                source,
            }
        })?
        .rename_columns(&macro_mapping)?
        .select(&macro_mapping.targets())?;
    info!(
        provider = macro_source.name(),
        rows = macro_table.len(),
        "macro data collection completed"
    );

    let market_table = market_source
        .fetch_market(&market_mapping.sources(), range)
        .map_err(|source| {
            error!(provider = market_source.name(), %source, "market fetch failed");
            PipelineError::MarketFetch {
                provider: market_source.name().to_string(),
                source,
            }
        })?
        .closes()?
        .rename_columns(&market_mapping)?
        .select(&market_mapping.targets())?;
    info!(
        provider = market_source.name(),
        rows = market_table.len(),
        "market data collection completed"
    );

    let table = align(&macro_table, &market_table)?;
    let stats = table.stats();
    if table.is_empty() {
        warn!(?stats, "no complete rows after alignment");
    } else {
        info!(
            rows = table.len(),
            dropped = stats.dropped_rows,
            first = %table.dates()[0],
            last = %table.dates()[table.len() - 1],
            "aligned dataset ready"
        );
    }

    let mut provenance = describe(&macro_mapping, SourceKind::Macro, macro_source.name());
    provenance.extend(describe(
        &market_mapping,
        SourceKind::Market,
        market_source.name(),
    ));

    Ok(MacroDataset {
        table,
        range,
        provenance,
    })
}

fn describe(mapping: &ColumnMapping, kind: SourceKind, provider: &str) -> Vec<ColumnProvenance> {
    mapping
        .targets()
        .into_iter()
        .map(|column| {
            let code = mapping.source_of(&column).unwrap_or(&column).to_string();
            ColumnProvenance {
                column,
                kind,
                provider: provider.to_string(),
                code,
            }
        })
        .collect()
}
