//! Yahoo Finance market data provider.
//!
//! Fetches daily bars from Yahoo's v8 chart API, one request per ticker, and
//! returns them grouped by price field. Each request is made once.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::http;
use super::market::{MarketFrame, PriceField};
use super::provider::{DateRange, FetchError, MarketSource};
use super::table::{ObservationTable, Series, TableError};
use crate::config::YahooConfig;
use chrono::NaiveDate;
use reqwest::blocking::{Client, Request};
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// One parsed daily bar; any field may be missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyQuote {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

impl DailyQuote {
    fn field(&self, field: PriceField) -> Option<f64> {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
            PriceField::Volume => self.volume,
        }
    }
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: Client,
    base_url: Url,
}

impl YahooProvider {
    pub fn new(config: &YahooConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: http::build_client(config.timeout_secs, &config.user_agent)?,
            base_url: http::parse_base_url(&config.base_url)?,
        })
    }

    /// Build the chart API request for a symbol and date range.
    fn chart_request(&self, symbol: &str, range: DateRange) -> Result<Request, FetchError> {
        let start_ts = range.start().and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = range
            .end()
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(format!("{} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(symbol);

        http::get_request(
            &self.client,
            url,
            &[
                ("period1", start_ts.to_string()),
                ("period2", end_ts.to_string()),
                ("interval", "1d".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ],
        )
    }

    fn fetch_one(&self, symbol: &str, range: DateRange) -> Result<Vec<DailyQuote>, FetchError> {
        let request = self.chart_request(symbol, range)?;
        debug!(url = %request.url(), "requesting Yahoo chart");

        let chart: ChartResponse = http::send(&self.client, request, symbol)?
            .json()
            .map_err(|e| {
                FetchError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })?;

        bars_in_range(symbol, parse_chart_response(symbol, chart)?, range)
    }
}

/// Keep the bars inside `range`; a range with no bars is empty.
fn bars_in_range(
    symbol: &str,
    quotes: Vec<DailyQuote>,
    range: DateRange,
) -> Result<Vec<DailyQuote>, FetchError> {
    let quotes: Vec<DailyQuote> = quotes.into_iter().filter(|q| range.contains(q.date)).collect();
    if quotes.is_empty() {
        return Err(FetchError::Empty(symbol.to_string()));
    }
    Ok(quotes)
}

impl MarketSource for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_market(
        &self,
        tickers: &[String],
        range: DateRange,
    ) -> Result<MarketFrame, FetchError> {
        let mut per_ticker = Vec::with_capacity(tickers.len());
        for symbol in tickers {
            let quotes = self.fetch_one(symbol, range)?;
            info!(%symbol, bars = quotes.len(), "fetched Yahoo chart");
            per_ticker.push((symbol.clone(), quotes));
        }
        Ok(group_by_field(&per_ticker)?)
    }
}

/// Reshape per-ticker quotes into one table per price field.
pub fn group_by_field(
    per_ticker: &[(String, Vec<DailyQuote>)],
) -> Result<MarketFrame, TableError> {
    let mut fields = BTreeMap::new();
    for field in PriceField::ALL {
        let series: Vec<(String, Series)> = per_ticker
            .iter()
            .map(|(symbol, quotes)| {
                let points = quotes.iter().map(|q| (q.date, q.field(field))).collect();
                (symbol.clone(), points)
            })
            .collect();
        fields.insert(field, ObservationTable::from_series(series)?);
    }
    Ok(MarketFrame::Grouped(fields))
}

/// Parse the chart API response into daily quotes.
pub fn parse_chart_response(
    symbol: &str,
    resp: ChartResponse,
) -> Result<Vec<DailyQuote>, FetchError> {
    let result = resp.chart.result.ok_or_else(|| {
        if let Some(err) = resp.chart.error {
            if err.code == "Not Found" {
                FetchError::NotFound(symbol.to_string())
            } else {
                FetchError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
        } else {
            FetchError::ResponseFormatChanged("empty result with no error".into())
        }
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::ResponseFormatChanged("result array is empty".into()))?;

    let Some(timestamps) = data.timestamp else {
        // Yahoo omits timestamps entirely when the range holds no trading days.
        return Ok(Vec::new());
    };

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut quotes = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let q = DailyQuote {
            date,
            open: pick(&quote.open, i),
            high: pick(&quote.high, i),
            low: pick(&quote.low, i),
            close: pick(&quote.close, i),
            adj_close: adj_closes.as_deref().and_then(|v| pick(v, i)),
            volume: pick(&quote.volume, i),
        };

        // Skip bars where all OHLCV are None (holidays/non-trading days)
        if q.open.is_none()
            && q.high.is_none()
            && q.low.is_none()
            && q.close.is_none()
            && q.volume.is_none()
        {
            continue;
        }
        quotes.push(q);
    }

    Ok(quotes)
}

fn pick(col: &[Option<f64>], i: usize) -> Option<f64> {
    col.get(i).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_JSON: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [4745.2, null, 4697.4],
                        "high":   [4754.3, null, 4726.8],
                        "low":    [4722.7, null, 4687.5],
                        "close":  [4742.8, null, 4688.7],
                        "volume": [3743050000, null, 3715480000]
                    }],
                    "adjclose": [{ "adjclose": [4742.8, null, 4688.7] }]
                }
            }],
            "error": null
        }
    }"#;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_bars_and_skips_empty_rows() {
        let resp: ChartResponse = serde_json::from_str(CHART_JSON).unwrap();
        let quotes = parse_chart_response("^GSPC", resp).unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].date, d("2024-01-02"));
        assert_eq!(quotes[0].close, Some(4742.8));
        assert_eq!(quotes[1].date, d("2024-01-04"));
        assert_eq!(quotes[1].adj_close, Some(4688.7));
        assert_eq!(quotes[1].volume, Some(3_715_480_000.0));
    }

    #[test]
    fn not_found_error_maps_to_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parse_chart_response("^NOPE", resp),
            Err(FetchError::NotFound(s)) if s == "^NOPE"
        ));
    }

    #[test]
    fn missing_timestamps_means_no_bars() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        assert!(parse_chart_response("^GSPC", resp).unwrap().is_empty());
    }

    #[test]
    fn grouped_frame_has_every_field() {
        let resp: ChartResponse = serde_json::from_str(CHART_JSON).unwrap();
        let quotes = parse_chart_response("^GSPC", resp).unwrap();
        let frame = group_by_field(&[("^GSPC".to_string(), quotes)]).unwrap();

        match &frame {
            MarketFrame::Grouped(fields) => {
                assert_eq!(fields.len(), PriceField::ALL.len());
                assert_eq!(
                    fields[&PriceField::Open].value(d("2024-01-02"), "^GSPC"),
                    Some(4745.2)
                );
            }
            MarketFrame::Flat(_) => panic!("expected grouped frame"),
        }
        let closes = frame.closes().unwrap();
        assert_eq!(closes.column("^GSPC").unwrap(), &[Some(4742.8), Some(4688.7)]);
    }

    #[test]
    fn chart_request_puts_symbol_in_path() {
        let provider = YahooProvider::new(&YahooConfig::default()).unwrap();
        let range = DateRange::new(d("2024-01-01"), d("2024-01-31")).unwrap();
        let request = provider.chart_request("^GSPC", range).unwrap();
        let url = request.url();

        assert_eq!(url.host_str(), Some("query2.finance.yahoo.com"));
        assert_eq!(
            url.path_segments().unwrap().collect::<Vec<_>>(),
            vec!["v8", "finance", "chart", "^GSPC"]
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("period1".to_string(), "1704067200".to_string()));
        assert_eq!(pairs[2], ("interval".to_string(), "1d".to_string()));
    }

    #[test]
    fn symbol_with_reserved_characters_stays_one_segment() {
        let provider = YahooProvider::new(&YahooConfig {
            base_url: "https://example.test/chart/".into(),
            ..YahooConfig::default()
        })
        .unwrap();
        let range = DateRange::new(d("2024-01-01"), d("2024-01-31")).unwrap();
        let request = provider
            .chart_request("X/Y?interval=1wk&a=b#c", range)
            .unwrap();
        let url = request.url();

        assert_eq!(url.path_segments().unwrap().count(), 2);
        assert_eq!(url.fragment(), None);
        let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(
            keys,
            vec!["period1", "period2", "interval", "includeAdjustedClose"]
        );
        assert!(url.query_pairs().any(|(k, v)| k == "interval" && v == "1d"));
    }

    #[test]
    fn bars_outside_range_are_dropped() {
        let resp: ChartResponse = serde_json::from_str(CHART_JSON).unwrap();
        let quotes = parse_chart_response("^GSPC", resp).unwrap();
        let range = DateRange::new(d("2024-01-03"), d("2024-01-31")).unwrap();

        let kept = bars_in_range("^GSPC", quotes, range).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, d("2024-01-04"));
    }

    #[test]
    fn no_bars_in_range_is_empty() {
        let resp: ChartResponse = serde_json::from_str(CHART_JSON).unwrap();
        let quotes = parse_chart_response("^GSPC", resp).unwrap();
        let range = DateRange::new(d("2023-01-01"), d("2023-12-31")).unwrap();
        assert!(matches!(
            bars_in_range("^GSPC", quotes, range),
            Err(FetchError::Empty(s)) if s == "^GSPC"
        ));

        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let quotes = parse_chart_response("^GSPC", resp).unwrap();
        assert!(matches!(
            bars_in_range("^GSPC", quotes, range),
            Err(FetchError::Empty(_))
        ));
    }
}
