//! macrolab core: macro and market time series on one daily date axis.
//!
//! This crate contains:
//! - The date-indexed observation table and provider-code → name mapping
//! - FRED and Yahoo Finance clients behind the `MacroSource`/`MarketSource` seams
//! - Multi-cadence alignment (outer join, forward fill, drop incomplete rows)
//! - Dataset configuration, the end-to-end pipeline and polars export

pub mod config;
pub mod data;
pub mod export;
pub mod pipeline;

pub use config::DatasetConfig;
pub use data::{AlignedTable, ObservationTable};
pub use pipeline::{build_dataset, MacroDataset, PipelineError};
