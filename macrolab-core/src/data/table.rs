//! Date-indexed observation table.
//!
//! An `ObservationTable` maps a strictly increasing date axis to a fixed,
//! ordered set of named numeric columns. Cells are `Option<f64>`; `None` is a
//! gap (the source did not observe that column on that date).

use super::mapping::ColumnMapping;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Errors raised while building or reshaping tables.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("duplicate date {0} in row input")]
    DuplicateDate(NaiveDate),

    #[error("row for {date} has {found} values, expected {expected}")]
    RowWidth {
        date: NaiveDate,
        expected: usize,
        found: usize,
    },

    #[error("mapping lists '{0}' more than once")]
    DuplicateMapping(String),

    #[error("{side} table is empty")]
    EmptyTable { side: &'static str },

    #[error("column '{0}' appears in both tables")]
    OverlappingColumn(String),

    #[error("column '{0}' is missing")]
    MissingColumn(String),

    #[error("grouped market frame has no '{0}' field")]
    MissingField(String),
}

/// Date-indexed table of named numeric columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    /// Column-major storage: `values[col][row]`.
    values: Vec<Vec<Option<f64>>>,
}

/// A single named series as returned by a provider.
pub type Series = Vec<(NaiveDate, Option<f64>)>;

impl ObservationTable {
    /// Empty table with the given columns and no rows.
    pub fn with_columns(columns: Vec<String>) -> Result<Self, TableError> {
        check_unique(&columns)?;
        let values = vec![Vec::new(); columns.len()];
        Ok(Self {
            dates: Vec::new(),
            columns,
            values,
        })
    }

    /// Build a table from independently sampled series.
    ///
    /// The index is the union of every series' dates. A series is null on the
    /// dates it does not cover. Within one series a repeated date keeps the
    /// last value; NaN is stored as null.
    pub fn from_series(series: Vec<(String, Series)>) -> Result<Self, TableError> {
        let names: Vec<String> = series.iter().map(|(name, _)| name.clone()).collect();
        check_unique(&names)?;

        let mut all_dates = BTreeSet::new();
        let mut lookups: Vec<BTreeMap<NaiveDate, Option<f64>>> = Vec::with_capacity(series.len());
        for (_, points) in series {
            let mut lookup = BTreeMap::new();
            for (date, value) in points {
                all_dates.insert(date);
                lookup.insert(date, value.filter(|v| !v.is_nan()));
            }
            lookups.push(lookup);
        }

        let dates: Vec<NaiveDate> = all_dates.into_iter().collect();
        let values = lookups
            .iter()
            .map(|lookup| {
                dates
                    .iter()
                    .map(|d| lookup.get(d).copied().flatten())
                    .collect()
            })
            .collect();

        Ok(Self {
            dates,
            columns: names,
            values,
        })
    }

    /// Build a table from row tuples. Rows may arrive in any order.
    pub fn from_rows(
        columns: Vec<String>,
        mut rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
    ) -> Result<Self, TableError> {
        check_unique(&columns)?;
        rows.sort_by_key(|(date, _)| *date);

        let width = columns.len();
        let mut table = Self {
            dates: Vec::with_capacity(rows.len()),
            columns,
            values: vec![Vec::with_capacity(rows.len()); width],
        };

        for (date, row) in rows {
            if row.len() != width {
                return Err(TableError::RowWidth {
                    date,
                    expected: width,
                    found: row.len(),
                });
            }
            if table.dates.last() == Some(&date) {
                return Err(TableError::DuplicateDate(date));
            }
            table.dates.push(date);
            for (col, value) in table.values.iter_mut().zip(row) {
                col.push(value.filter(|v| !v.is_nan()));
            }
        }

        Ok(table)
    }

    /// Assemble from parts that already satisfy the table invariants.
    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Self {
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        debug_assert_eq!(columns.len(), values.len());
        debug_assert!(values.iter().all(|v| v.len() == dates.len()));
        Self {
            dates,
            columns,
            values,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Cells of a column in date order.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column_index(name).map(|i| self.values[i].as_slice())
    }

    /// Cell at `(date, column)`. `None` if the date, the column or the value is missing.
    pub fn value(&self, date: NaiveDate, name: &str) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        let col = self.column_index(name)?;
        self.values[col][row]
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<Option<f64>>> {
        if index >= self.len() {
            return None;
        }
        Some(self.values.iter().map(|col| col[index]).collect())
    }

    pub fn null_count(&self) -> usize {
        self.values
            .iter()
            .map(|col| col.iter().filter(|v| v.is_none()).count())
            .sum()
    }

    pub fn has_nulls(&self) -> bool {
        self.values.iter().any(|col| col.iter().any(Option::is_none))
    }

    /// Rename columns through a provider-code → name mapping.
    ///
    /// Names absent from the mapping are kept as-is.
    pub fn rename_columns(mut self, mapping: &ColumnMapping) -> Result<Self, TableError> {
        let renamed: Vec<String> = self
            .columns
            .iter()
            .map(|c| mapping.apply(c).to_string())
            .collect();
        check_unique(&renamed)?;
        self.columns = renamed;
        Ok(self)
    }

    /// Keep only `names`, in that order. Every name must exist.
    pub fn select(&self, names: &[String]) -> Result<Self, TableError> {
        check_unique(names)?;
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .column_index(name)
                .ok_or_else(|| TableError::MissingColumn(name.clone()))?;
            values.push(self.values[idx].clone());
        }
        Ok(Self {
            dates: self.dates.clone(),
            columns: names.to_vec(),
            values,
        })
    }

    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub(crate) fn values(&self) -> &[Vec<Option<f64>>] {
        &self.values
    }

    pub(crate) fn into_parts(self) -> (Vec<NaiveDate>, Vec<String>, Vec<Vec<Option<f64>>>) {
        (self.dates, self.columns, self.values)
    }
}

fn check_unique(names: &[String]) -> Result<(), TableError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(TableError::DuplicateColumn(name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn from_series_unions_dates() {
        let table = ObservationTable::from_series(vec![
            (
                "GDP".into(),
                vec![(d("2020-01-01"), Some(21_000.0)), (d("2020-04-01"), Some(19_500.0))],
            ),
            (
                "US_10Y".into(),
                vec![(d("2020-01-02"), Some(1.88)), (d("2020-01-03"), Some(1.80))],
            ),
        ])
        .unwrap();

        assert_eq!(
            table.dates(),
            &[d("2020-01-01"), d("2020-01-02"), d("2020-01-03"), d("2020-04-01")]
        );
        assert_eq!(table.value(d("2020-01-01"), "GDP"), Some(21_000.0));
        assert_eq!(table.value(d("2020-01-02"), "GDP"), None);
        assert_eq!(table.value(d("2020-01-03"), "US_10Y"), Some(1.80));
        assert_eq!(table.null_count(), 4);
    }

    #[test]
    fn from_series_last_duplicate_wins_and_nan_is_null() {
        let table = ObservationTable::from_series(vec![(
            "CPI".into(),
            vec![
                (d("2020-01-01"), Some(1.0)),
                (d("2020-01-01"), Some(2.0)),
                (d("2020-02-01"), Some(f64::NAN)),
            ],
        )])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(d("2020-01-01"), "CPI"), Some(2.0));
        assert!(table.has_nulls());
    }

    #[test]
    fn duplicate_series_name_rejected() {
        let err = ObservationTable::from_series(vec![
            ("CPI".into(), vec![]),
            ("CPI".into(), vec![]),
        ])
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("CPI".into()));
    }

    #[test]
    fn from_rows_sorts_and_checks_shape() {
        let cols = vec!["a".to_string(), "b".to_string()];
        let table = ObservationTable::from_rows(
            cols.clone(),
            vec![
                (d("2020-01-03"), vec![Some(3.0), None]),
                (d("2020-01-01"), vec![Some(1.0), Some(10.0)]),
            ],
        )
        .unwrap();
        assert_eq!(table.dates()[0], d("2020-01-01"));
        assert_eq!(table.row(1), Some(vec![Some(3.0), None]));

        let err = ObservationTable::from_rows(cols.clone(), vec![(d("2020-01-01"), vec![None])])
            .unwrap_err();
        assert!(matches!(err, TableError::RowWidth { expected: 2, found: 1, .. }));

        let err = ObservationTable::from_rows(
            cols,
            vec![
                (d("2020-01-01"), vec![None, None]),
                (d("2020-01-01"), vec![None, None]),
            ],
        )
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateDate(d("2020-01-01")));
    }

    #[test]
    fn rename_passes_unmapped_through() {
        let mapping = ColumnMapping::new([("^GSPC", "SP500")]).unwrap();
        let table = ObservationTable::with_columns(vec!["^GSPC".into(), "^DJI".into()])
            .unwrap()
            .rename_columns(&mapping)
            .unwrap();
        assert_eq!(table.columns(), &["SP500".to_string(), "^DJI".to_string()]);
    }

    #[test]
    fn select_reorders_and_requires_columns() {
        let table = ObservationTable::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![(d("2020-01-01"), vec![Some(1.0), Some(2.0), Some(3.0)])],
        )
        .unwrap();

        let picked = table.select(&["c".into(), "a".into()]).unwrap();
        assert_eq!(picked.columns(), &["c".to_string(), "a".to_string()]);
        assert_eq!(picked.row(0), Some(vec![Some(3.0), Some(1.0)]));

        assert_eq!(
            table.select(&["z".into()]).unwrap_err(),
            TableError::MissingColumn("z".into())
        );
    }

    #[test]
    fn rename_into_collision_rejected() {
        let mapping = ColumnMapping::new([("^GSPC", "SP500")]).unwrap();
        let err = ObservationTable::with_columns(vec!["^GSPC".into(), "SP500".into()])
            .unwrap()
            .rename_columns(&mapping)
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("SP500".into()));
    }
}
