//! Integration tests for provider parsing using frozen response fixtures.
//!
//! The fixtures are trimmed copies of real FRED CSV exports and a Yahoo chart
//! response; they drive the same parse → reshape → align path the live
//! providers use, without network access.

use chrono::NaiveDate;
use macrolab_core::data::fred::parse_fredgraph_csv;
use macrolab_core::data::yahoo::{group_by_field, parse_chart_response, ChartResponse};
use macrolab_core::data::{align, ColumnMapping, ObservationTable};

const CPI_CSV: &str = include_str!("fixtures/cpiaucsl_2020.csv");
const DGS10_CSV: &str = include_str!("fixtures/dgs10_2020_01.csv");
const GSPC_JSON: &str = include_str!("fixtures/gspc_2020_01.json");

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn macro_table() -> ObservationTable {
    let cpi = parse_fredgraph_csv("CPIAUCSL", CPI_CSV).unwrap();
    let dgs10 = parse_fredgraph_csv("DGS10", DGS10_CSV).unwrap();
    let mapping = ColumnMapping::new([("CPIAUCSL", "CPI"), ("DGS10", "US_10Y")]).unwrap();
    ObservationTable::from_series(vec![("CPIAUCSL".into(), cpi), ("DGS10".into(), dgs10)])
        .unwrap()
        .rename_columns(&mapping)
        .unwrap()
}

fn market_table() -> ObservationTable {
    let resp: ChartResponse = serde_json::from_str(GSPC_JSON).unwrap();
    let quotes = parse_chart_response("^GSPC", resp).unwrap();
    let mapping = ColumnMapping::new([("^GSPC", "SP500")]).unwrap();
    group_by_field(&[("^GSPC".to_string(), quotes)])
        .unwrap()
        .closes()
        .unwrap()
        .rename_columns(&mapping)
        .unwrap()
}

#[test]
fn fixtures_parse_into_tables() {
    let macro_t = macro_table();
    assert_eq!(macro_t.columns(), &["CPI".to_string(), "US_10Y".to_string()]);
    assert_eq!(macro_t.value(d("2020-03-01"), "CPI"), Some(258.076));
    // FRED writes "." on holidays
    assert_eq!(macro_t.value(d("2020-01-01"), "US_10Y"), None);

    let market = market_table();
    assert_eq!(market.len(), 4);
    assert_eq!(market.dates()[0], d("2020-01-02"));
    assert_eq!(market.value(d("2020-01-07"), "SP500"), Some(3237.18));
}

#[test]
fn fixtures_align_into_complete_daily_table() {
    let aligned = align(&macro_table(), &market_table()).unwrap();

    assert_eq!(aligned.null_count(), 0);
    assert_eq!(
        aligned.columns(),
        &["CPI".to_string(), "US_10Y".to_string(), "SP500".to_string()]
    );

    // 2020-01-01 has CPI but neither a yield nor an index close yet
    assert_eq!(aligned.dates().first(), Some(&d("2020-01-02")));
    assert_eq!(aligned.dates().last(), Some(&d("2020-06-01")));
    assert_eq!(aligned.len(), 9);
    assert_eq!(aligned.stats().dropped_rows, 1);

    // Monthly CPI carried onto daily rows
    assert_eq!(aligned.value(d("2020-01-07"), "CPI"), Some(259.127));
    // Daily series carried onto month-start rows after the fixtures end
    assert_eq!(aligned.value(d("2020-06-01"), "US_10Y"), Some(1.83));
    assert_eq!(aligned.value(d("2020-06-01"), "SP500"), Some(3237.18));
    assert_eq!(aligned.value(d("2020-06-01"), "CPI"), Some(257.042));
}
