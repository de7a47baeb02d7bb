//! Data model, provider clients and alignment.

pub mod align;
pub mod fred;
mod http;
pub mod mapping;
pub mod market;
pub mod provider;
pub mod table;
pub mod yahoo;

pub use align::{align, align_merged, AlignStats, AlignedTable};
pub use fred::FredProvider;
pub use mapping::ColumnMapping;
pub use market::{MarketFrame, PriceField};
pub use provider::{DateRange, FetchError, MacroSource, MarketSource, RangeError};
pub use table::{ObservationTable, Series, TableError};
pub use yahoo::YahooProvider;
