//! Data provider traits and structured error types.
//!
//! `MacroSource` and `MarketSource` abstract over the two external services
//! (FRED and Yahoo Finance) so the pipeline can be driven by fakes in tests.

use super::market::MarketFrame;
use super::table::{ObservationTable, TableError};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Structured error types for a provider fetch.
///
/// These are designed to be displayable in log lines and CLI output.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {what}")]
    HttpStatus { status: u16, what: String },

    #[error("rate limited by provider{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("series or symbol not found: {0}")]
    NotFound(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("provider returned no observations for {0}")]
    Empty(String),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    #[error("start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// January 1 of `year` through `end`.
    pub fn from_start_year(year: i32, end: NaiveDate) -> Result<Self, RangeError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(RangeError::InvalidYear(year))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_year(&self) -> i32 {
        self.start.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Source of macroeconomic series (collaborator A).
pub trait MacroSource {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the given series over a date range.
    ///
    /// The returned table has one column per series id, named by the id.
    fn fetch_series(
        &self,
        series_ids: &[String],
        range: DateRange,
    ) -> Result<ObservationTable, FetchError>;
}

/// Source of equity index prices (collaborator B).
pub trait MarketSource {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily prices for tickers over a date range.
    fn fetch_market(&self, tickers: &[String], range: DateRange)
        -> Result<MarketFrame, FetchError>;
}
