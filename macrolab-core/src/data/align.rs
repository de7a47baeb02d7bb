//! Multi-cadence time alignment.
//!
//! Macro series arrive monthly or quarterly, markets print on trading days.
//! Alignment outer-joins both tables on date, carries each column's last
//! observation forward, then drops rows that are still incomplete. There is
//! no backward fill: a column is never populated before its first print.

use super::table::{ObservationTable, TableError};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Row accounting for one alignment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlignStats {
    pub left_rows: usize,
    pub right_rows: usize,
    pub merged_rows: usize,
    pub dropped_rows: usize,
}

/// Gap-free, date-sorted table produced by alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    table: ObservationTable,
    stats: AlignStats,
}

impl AlignedTable {
    pub fn table(&self) -> &ObservationTable {
        &self.table
    }

    pub fn stats(&self) -> AlignStats {
        self.stats
    }

    pub fn into_inner(self) -> ObservationTable {
        self.table
    }
}

impl std::ops::Deref for AlignedTable {
    type Target = ObservationTable;

    fn deref(&self) -> &ObservationTable {
        &self.table
    }
}

/// Align a macro table with a market table.
///
/// Both inputs must be non-empty and their column names disjoint. Output
/// columns are the left table's followed by the right table's.
pub fn align(
    left: &ObservationTable,
    right: &ObservationTable,
) -> Result<AlignedTable, TableError> {
    if left.is_empty() {
        return Err(TableError::EmptyTable { side: "macro" });
    }
    if right.is_empty() {
        return Err(TableError::EmptyTable { side: "market" });
    }

    let merged = outer_join(left, right)?;
    let mut aligned = align_merged(merged);
    aligned.stats.left_rows = left.len();
    aligned.stats.right_rows = right.len();
    Ok(aligned)
}

/// Forward-fill and drop incomplete rows of an already merged table.
pub fn align_merged(mut merged: ObservationTable) -> AlignedTable {
    let merged_rows = merged.len();
    forward_fill(&mut merged);
    let dropped_rows = drop_incomplete(&mut merged);

    debug!(
        merged_rows,
        dropped_rows,
        kept_rows = merged.len(),
        "aligned table"
    );

    AlignedTable {
        table: merged,
        stats: AlignStats {
            left_rows: 0,
            right_rows: 0,
            merged_rows,
            dropped_rows,
        },
    }
}

/// Outer join on date.
///
/// The result index is the sorted union of both date sets. Each side's
/// columns are null on dates that side does not cover.
pub fn outer_join(
    left: &ObservationTable,
    right: &ObservationTable,
) -> Result<ObservationTable, TableError> {
    let left_names: HashSet<&str> = left.columns().iter().map(String::as_str).collect();
    if let Some(dup) = right
        .columns()
        .iter()
        .find(|c| left_names.contains(c.as_str()))
    {
        return Err(TableError::OverlappingColumn(dup.clone()));
    }

    let mut all_dates = BTreeSet::new();
    all_dates.extend(left.dates().iter().copied());
    all_dates.extend(right.dates().iter().copied());
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut columns = Vec::with_capacity(left.width() + right.width());
    let mut values = Vec::with_capacity(left.width() + right.width());
    for side in [left, right] {
        // Build a lookup per side: date → row
        let row_of: HashMap<NaiveDate, usize> = side
            .dates()
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, i))
            .collect();

        for (name, cells) in side.columns().iter().zip(side.values()) {
            columns.push(name.clone());
            values.push(
                dates
                    .iter()
                    .map(|d| row_of.get(d).and_then(|&i| cells[i]))
                    .collect::<Vec<_>>(),
            );
        }
    }

    Ok(ObservationTable::from_parts(dates, columns, values))
}

/// Replace each null with the nearest preceding non-null in the same column.
///
/// Leading nulls (before a column's first observation) stay null.
pub fn forward_fill(table: &mut ObservationTable) {
    let (dates, columns, mut values) = std::mem::take(table).into_parts();
    for cells in &mut values {
        let mut last = None;
        for cell in cells.iter_mut() {
            match cell {
                Some(v) => last = Some(*v),
                None => *cell = last,
            }
        }
    }
    *table = ObservationTable::from_parts(dates, columns, values);
}

/// Remove every row holding a null. Returns the number of rows removed.
pub fn drop_incomplete(table: &mut ObservationTable) -> usize {
    let (dates, columns, values) = std::mem::take(table).into_parts();
    let keep: Vec<bool> = (0..dates.len())
        .map(|row| values.iter().all(|col| col[row].is_some()))
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();

    let dates = dates
        .into_iter()
        .zip(&keep)
        .filter_map(|(d, &k)| k.then_some(d))
        .collect();
    let values = values
        .into_iter()
        .map(|col| {
            col.into_iter()
                .zip(&keep)
                .filter_map(|(v, &k)| k.then_some(v))
                .collect()
        })
        .collect();

    *table = ObservationTable::from_parts(dates, columns, values);
    dropped
}
