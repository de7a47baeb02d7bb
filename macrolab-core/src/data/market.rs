//! Market data frames as returned by a market provider.
//!
//! A provider hands back either a flat table of closing levels keyed by
//! ticker, or a grouped frame with one table per price field. Only closing
//! levels feed the aligned dataset.

use super::table::{ObservationTable, TableError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Price field of a daily bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl PriceField {
    pub const ALL: [PriceField; 6] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::AdjClose,
        PriceField::Volume,
    ];
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::AdjClose => "Adj Close",
            PriceField::Volume => "Volume",
        };
        f.write_str(label)
    }
}

/// Market table in either of the two shapes a provider may return.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketFrame {
    /// Columns are ticker codes holding closing levels.
    Flat(ObservationTable),
    /// One table per price field; each table's columns are ticker codes.
    Grouped(BTreeMap<PriceField, ObservationTable>),
}

impl MarketFrame {
    /// Closing levels keyed by ticker code.
    pub fn closes(self) -> Result<ObservationTable, TableError> {
        match self {
            MarketFrame::Flat(table) => Ok(table),
            MarketFrame::Grouped(mut fields) => fields
                .remove(&PriceField::Close)
                .ok_or_else(|| TableError::MissingField(PriceField::Close.to_string())),
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, MarketFrame::Grouped(_))
    }
}
