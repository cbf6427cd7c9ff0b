//! Explicit alignment of tables onto a common timeline.
//!
//! Every combination of tables goes through one of these functions so the
//! fill policy is visible at the call site. Rows absent from a source come
//! out as `NaN` unless the policy says otherwise.

use super::{TableError, TimeSeriesTable};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// How to populate target rows that have no exact match in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Exact date match only; everything else is `NaN`.
    None,
    /// Last source observation at or before the target date (as-of).
    Forward,
    /// Exact date match only; everything else is `0.0`.
    Zero,
}

/// Sorted union of the indices of all tables.
pub fn union_index(tables: &[&TimeSeriesTable]) -> Vec<NaiveDate> {
    let mut all = BTreeSet::new();
    for table in tables {
        all.extend(table.index().iter().copied());
    }
    all.into_iter().collect()
}

/// Conform `table` to `index` under the given fill policy.
pub fn reindex(table: &TimeSeriesTable, index: &[NaiveDate], fill: Fill) -> TimeSeriesTable {
    let source = table.index();
    let missing = match fill {
        Fill::Zero => 0.0,
        Fill::None | Fill::Forward => f64::NAN,
    };

    // Both indices are sorted, so one forward sweep finds every match.
    let mut positions: Vec<Option<usize>> = Vec::with_capacity(index.len());
    let mut cursor = 0usize;
    for date in index {
        while cursor < source.len() && source[cursor] < *date {
            cursor += 1;
        }
        let exact = cursor < source.len() && source[cursor] == *date;
        let pos = if exact {
            Some(cursor)
        } else if fill == Fill::Forward && cursor > 0 {
            Some(cursor - 1)
        } else {
            None
        };
        positions.push(pos);
    }

    let columns = table
        .iter_columns()
        .map(|(_, values)| {
            positions
                .iter()
                .map(|p| p.map(|i| values[i]).unwrap_or(missing))
                .collect()
        })
        .collect();

    TimeSeriesTable::from_parts(index.to_vec(), table.names().to_vec(), columns)
}

/// Outer-join tables side by side on the union of their indices.
///
/// Column names must be unique across all inputs.
pub fn concat_columns(tables: &[&TimeSeriesTable]) -> Result<TimeSeriesTable, TableError> {
    let index = union_index(tables);
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut columns = Vec::new();
    for table in tables {
        let aligned = reindex(table, &index, Fill::None);
        for (name, values) in aligned.iter_columns() {
            if !seen.insert(name.to_string()) {
                return Err(TableError::DuplicateColumn(name.to_string()));
            }
            names.push(name.to_string());
            columns.push(values.to_vec());
        }
    }
    debug!(
        tables = tables.len(),
        rows = index.len(),
        columns = names.len(),
        "concatenated tables on union index"
    );
    Ok(TimeSeriesTable::from_parts(index, names, columns))
}

/// Align two tables on the union of rows **and** columns.
///
/// Columns keep first-seen order (`a`'s columns, then `b`'s extras). Cells
/// that exist on only one side are `NaN` on the other.
pub fn align_outer(
    a: &TimeSeriesTable,
    b: &TimeSeriesTable,
) -> (TimeSeriesTable, TimeSeriesTable) {
    let index = union_index(&[a, b]);
    let mut names: Vec<String> = a.names().to_vec();
    for n in b.names() {
        if !names.contains(n) {
            names.push(n.clone());
        }
    }
    let expand = |t: &TimeSeriesTable| {
        let rows = reindex(t, &index, Fill::None);
        let columns = names
            .iter()
            .map(|n| {
                rows.column(n)
                    .map(|c| c.to_vec())
                    .unwrap_or_else(|| vec![f64::NAN; index.len()])
            })
            .collect();
        TimeSeriesTable::from_parts(index.clone(), names.clone(), columns)
    };
    (expand(a), expand(b))
}
