//! FRED macro data provider.
//!
//! Pulls series from the keyless `fredgraph.csv` export, one request per
//! series id. Each request is made once; the first failure aborts the fetch.

use super::http;
use super::provider::{DateRange, FetchError, MacroSource};
use super::table::{ObservationTable, Series};
use crate::config::FredConfig;
use chrono::NaiveDate;
use reqwest::blocking::{Client, Request};
use reqwest::Url;
use tracing::{debug, info};

/// FRED data provider.
pub struct FredProvider {
    client: Client,
    base_url: Url,
}

impl FredProvider {
    pub fn new(config: &FredConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: http::build_client(config.timeout_secs, &config.user_agent)?,
            base_url: http::parse_base_url(config.base_url.trim_end_matches('/'))?,
        })
    }

    /// Build the CSV export request for a series and date range.
    fn series_request(&self, series_id: &str, range: DateRange) -> Result<Request, FetchError> {
        http::get_request(
            &self.client,
            self.base_url.clone(),
            &[
                ("id", series_id.to_string()),
                ("cosd", range.start().format("%Y-%m-%d").to_string()),
                ("coed", range.end().format("%Y-%m-%d").to_string()),
            ],
        )
    }

    fn fetch_one(&self, series_id: &str, range: DateRange) -> Result<Series, FetchError> {
        let request = self.series_request(series_id, range)?;
        debug!(url = %request.url(), "requesting FRED series");

        let body = http::send(&self.client, request, series_id)?
            .text()
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

        observations_in_range(series_id, parse_fredgraph_csv(series_id, &body)?, range)
    }
}

/// Keep the observations inside `range`; a series with no value there is empty.
fn observations_in_range(
    series_id: &str,
    points: Series,
    range: DateRange,
) -> Result<Series, FetchError> {
    let points: Series = points
        .into_iter()
        .filter(|(date, _)| range.contains(*date))
        .collect();

    if points.iter().all(|(_, v)| v.is_none()) {
        return Err(FetchError::Empty(series_id.to_string()));
    }
    Ok(points)
}

impl MacroSource for FredProvider {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch_series(
        &self,
        series_ids: &[String],
        range: DateRange,
    ) -> Result<ObservationTable, FetchError> {
        let mut series = Vec::with_capacity(series_ids.len());
        for id in series_ids {
            let points = self.fetch_one(id, range)?;
            info!(series = %id, observations = points.len(), "fetched FRED series");
            series.push((id.clone(), points));
        }
        Ok(ObservationTable::from_series(series)?)
    }
}

/// Parse a `fredgraph.csv` body into dated observations.
///
/// The first column is the date (`observation_date`, or `DATE` in older
/// exports). The value column is the one named after the series, falling
/// back to the second column. FRED writes `.` for a missing observation.
pub fn parse_fredgraph_csv(series_id: &str, body: &str) -> Result<Series, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchError::ResponseFormatChanged(format!("{series_id}: {e}")))?
        .clone();

    let date_header = headers.get(0).unwrap_or_default();
    if !date_header.eq_ignore_ascii_case("observation_date") && !date_header.eq_ignore_ascii_case("date")
    {
        return Err(FetchError::ResponseFormatChanged(format!(
            "{series_id}: unexpected first column '{date_header}'"
        )));
    }
    let value_idx = headers
        .iter()
        .position(|h| h == series_id)
        .or_else(|| (headers.len() >= 2).then_some(1))
        .ok_or_else(|| {
            FetchError::ResponseFormatChanged(format!("{series_id}: no value column"))
        })?;

    let mut points = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| FetchError::ResponseFormatChanged(format!("{series_id}: {e}")))?;

        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            FetchError::ResponseFormatChanged(format!("{series_id}: bad date '{raw_date}': {e}"))
        })?;

        let raw_value = record.get(value_idx).unwrap_or_default();
        let value = match raw_value {
            "" | "." => None,
            v => Some(v.parse::<f64>().map_err(|e| {
                FetchError::ResponseFormatChanged(format!("{series_id}: bad value '{v}': {e}"))
            })?),
        };
        points.push((date, value));
    }

    Ok(points)
}
