//! Polars conversion and file export for aligned tables.
//!
//! Output is written for downstream consumers only; nothing here is read
//! back by the pipeline.

use crate::data::ObservationTable;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported output extension '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(String),
}

/// File format chosen from an output path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "parquet" | "pq" => Ok(ExportFormat::Parquet),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Convert a table to a DataFrame: a `date` column followed by one Float64 column per field.
pub fn to_dataframe(table: &ObservationTable) -> Result<DataFrame, ExportError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let days: Vec<i32> = table
        .dates()
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(table.width() + 1);
    columns.push(Column::new("date".into(), days).cast(&DataType::Date)?);
    for name in table.columns() {
        let cells = table.column(name).unwrap_or_default();
        columns.push(Column::new(name.as_str().into(), cells));
    }

    Ok(DataFrame::new(columns)?)
}

/// Write a DataFrame as CSV with a header row.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut file = create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df.clone())?;
    Ok(())
}

/// Write a DataFrame to a Parquet file.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    let file = create(path)?;
    ParquetWriter::new(file).finish(&mut df.clone())?;
    Ok(())
}

/// Write a table to `path`, picking the format from its extension.
pub fn write_table(table: &ObservationTable, path: &Path) -> Result<ExportFormat, ExportError> {
    let format = ExportFormat::from_path(path)?;
    let df = to_dataframe(table)?;
    match format {
        ExportFormat::Csv => write_csv(&df, path)?,
        ExportFormat::Parquet => write_parquet(&df, path)?,
    }
    Ok(format)
}

/// Deterministic BLAKE3 fingerprint over dates, column names and values.
pub fn content_hash(table: &ObservationTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for name in table.columns() {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    for (row, date) in table.dates().iter().enumerate() {
        hasher.update(date.to_string().as_bytes());
        for name in table.columns() {
            match table.column(name).and_then(|c| c[row]) {
                Some(v) => hasher.update(&v.to_le_bytes()),
                None => hasher.update(b"null"),
            };
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn create(path: &Path) -> Result<fs::File, ExportError> {
    fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}
