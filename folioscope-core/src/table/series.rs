use super::align::{self, Fill};
use super::TableError;
use crate::frequency::Frequency;
use crate::period::TimePeriod;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Date-indexed table of named `f64` columns.
///
/// The index is strictly increasing and every column has exactly one value
/// per index entry. Operations return new tables; the receiver is never
/// modified.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    index: Vec<NaiveDate>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl TimeSeriesTable {
    /// Build a table, validating index order, column lengths and name uniqueness.
    pub fn new(
        index: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        for (row, pair) in index.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(TableError::UnsortedIndex {
                    row: row + 1,
                    date: pair[1],
                });
            }
        }

        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (name, data) in columns {
            if data.len() != index.len() {
                return Err(TableError::LengthMismatch {
                    column: name,
                    expected: index.len(),
                    actual: data.len(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(TableError::DuplicateColumn(name));
            }
            names.push(name);
            values.push(data);
        }

        Ok(Self {
            index,
            names,
            columns: values,
        })
    }

    /// Single-column table.
    pub fn from_series(
        name: impl Into<String>,
        index: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<Self, TableError> {
        Self::new(index, vec![(name.into(), values)])
    }

    /// Table with an index and no columns.
    pub fn with_index(index: Vec<NaiveDate>) -> Result<Self, TableError> {
        Self::new(index, Vec::new())
    }

    /// Table with no rows and no columns.
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Build from parts already known to be consistent (crate-internal).
    pub(crate) fn from_parts(
        index: Vec<NaiveDate>,
        names: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(names.len(), columns.len());
        debug_assert!(columns.iter().all(|c| c.len() == index.len()));
        Self {
            index,
            names,
            columns,
        }
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.position(name).map(|i| self.columns[i].as_slice())
    }

    pub fn column_at(&self, i: usize) -> &[f64] {
        &self.columns[i]
    }

    /// Iterate `(name, values)` pairs in column order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .zip(self.columns.iter())
            .map(|(n, c)| (n.as_str(), c.as_slice()))
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.columns[col][row]
    }

    /// Values of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[row]).collect()
    }

    /// Keep only the named columns, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Self, TableError> {
        let mut out_names = Vec::with_capacity(names.len());
        let mut out_cols = Vec::with_capacity(names.len());
        for name in names {
            let pos = self
                .position(name)
                .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;
            out_names.push(self.names[pos].clone());
            out_cols.push(self.columns[pos].clone());
        }
        Ok(Self::from_parts(self.index.clone(), out_names, out_cols))
    }

    /// One column as a single-column table.
    pub fn single(&self, name: &str) -> Result<Self, TableError> {
        self.select(&[name])
    }

    /// Drop the named column if present.
    pub fn drop_column(&self, name: &str) -> Self {
        let mut out = self.clone();
        if let Some(pos) = out.position(name) {
            out.names.remove(pos);
            out.columns.remove(pos);
        }
        out
    }

    pub fn rename_column(&self, from: &str, to: impl Into<String>) -> Result<Self, TableError> {
        let pos = self
            .position(from)
            .ok_or_else(|| TableError::UnknownColumn(from.to_string()))?;
        let to = to.into();
        if self.names.iter().enumerate().any(|(i, n)| i != pos && *n == to) {
            return Err(TableError::DuplicateColumn(to));
        }
        let mut out = self.clone();
        out.names[pos] = to;
        Ok(out)
    }

    /// Replace every column name at once.
    pub fn with_names(&self, names: Vec<String>) -> Result<Self, TableError> {
        if names.len() != self.width() {
            return Err(TableError::ShapeMismatch(format!(
                "{} names for {} columns",
                names.len(),
                self.width()
            )));
        }
        Self::new(
            self.index.clone(),
            names.into_iter().zip(self.columns.iter().cloned()).collect(),
        )
    }

    /// Rename every column to `"{prefix}-{name}"`.
    pub fn prefix_columns(&self, prefix: &str) -> Self {
        let names = self
            .names
            .iter()
            .map(|n| format!("{prefix}-{n}"))
            .collect();
        Self::from_parts(self.index.clone(), names, self.columns.clone())
    }

    /// Insert a column at `pos` (clamped to the width).
    pub fn insert_column(
        &self,
        pos: usize,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, TableError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        if self.position(&name).is_some() {
            return Err(TableError::DuplicateColumn(name));
        }
        let mut out = self.clone();
        let pos = pos.min(out.width());
        out.names.insert(pos, name);
        out.columns.insert(pos, values);
        Ok(out)
    }

    pub fn push_column(
        &self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, TableError> {
        self.insert_column(self.width(), name, values)
    }

    /// Apply `f` to every cell.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| c.iter().map(|v| f(*v)).collect())
            .collect();
        Self::from_parts(self.index.clone(), self.names.clone(), columns)
    }

    /// Replace `NaN` with the last valid observation of the same column.
    /// Leading `NaN`s stay `NaN`.
    pub fn ffill(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut last = f64::NAN;
                c.iter()
                    .map(|v| {
                        if v.is_nan() {
                            last
                        } else {
                            last = *v;
                            *v
                        }
                    })
                    .collect()
            })
            .collect();
        Self::from_parts(self.index.clone(), self.names.clone(), columns)
    }

    pub fn fill_nan(&self, value: f64) -> Self {
        self.map_values(|v| if v.is_nan() { value } else { v })
    }

    /// Element-wise `self - other`; both tables must share index and columns.
    pub fn sub(&self, other: &Self) -> Result<Self, TableError> {
        if self.index != other.index || self.names != other.names {
            return Err(TableError::ShapeMismatch(
                "subtraction requires identical index and columns; align first".into(),
            ));
        }
        let columns = self
            .columns
            .iter()
            .zip(other.columns.iter())
            .map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| x - y).collect())
            .collect();
        Ok(Self::from_parts(
            self.index.clone(),
            self.names.clone(),
            columns,
        ))
    }

    /// Outer-align both tables on rows and columns, then subtract.
    /// Cells missing on either side come out as `NaN`.
    pub fn sub_aligned(&self, other: &Self) -> Result<Self, TableError> {
        let (a, b) = align::align_outer(self, other);
        a.sub(&b)
    }

    /// Running sum down each column. `NaN` cells stay `NaN` and are skipped
    /// by the accumulator.
    pub fn cumsum(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut acc = 0.0;
                c.iter()
                    .map(|v| {
                        if v.is_nan() {
                            f64::NAN
                        } else {
                            acc += v;
                            acc
                        }
                    })
                    .collect()
            })
            .collect();
        Self::from_parts(self.index.clone(), self.names.clone(), columns)
    }

    /// Trailing sum over `window` rows. The first `window - 1` rows and any
    /// window containing a `NaN` are `NaN`.
    pub fn rolling_sum(&self, window: usize) -> Result<Self, TableError> {
        if window == 0 {
            return Err(TableError::EmptyWindow);
        }
        let columns = self
            .columns
            .iter()
            .map(|c| {
                (0..c.len())
                    .map(|end| {
                        if end + 1 < window {
                            return f64::NAN;
                        }
                        let slice = &c[end + 1 - window..=end];
                        if slice.iter().any(|v| v.is_nan()) {
                            f64::NAN
                        } else {
                            slice.iter().sum()
                        }
                    })
                    .collect()
            })
            .collect();
        Ok(Self::from_parts(
            self.index.clone(),
            self.names.clone(),
            columns,
        ))
    }

    /// Sum across columns per row, skipping `NaN` (all-`NaN` rows sum to 0).
    pub fn row_sum(&self, name: impl Into<String>) -> Self {
        let sums = (0..self.len())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c[row])
                    .filter(|v| !v.is_nan())
                    .sum()
            })
            .collect();
        Self::from_parts(self.index.clone(), vec![name.into()], vec![sums])
    }

    /// Rows whose date falls inside `period` (inclusive bounds).
    pub fn locate(&self, period: &TimePeriod) -> Self {
        let keep: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, d)| period.contains(**d))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&keep)
    }

    /// `locate` when a period is given, otherwise a clone.
    pub fn locate_opt(&self, period: Option<&TimePeriod>) -> Self {
        match period {
            Some(p) => self.locate(p),
            None => self.clone(),
        }
    }

    /// Conform to a new index using the given fill policy.
    pub fn reindex(&self, index: &[NaiveDate], fill: Fill) -> Self {
        align::reindex(self, index, fill)
    }

    /// Conform to a regular `freq` grid spanning the table, forward-filled.
    pub fn asfreq(&self, freq: Frequency) -> Self {
        match (self.first_date(), self.last_date()) {
            (Some(start), Some(end)) => {
                let grid = freq.grid(start, end);
                self.reindex(&grid, Fill::Forward)
            }
            _ => self.clone(),
        }
    }

    /// Downsample to `freq`, keeping the last non-`NaN` value of every
    /// period per column. The new index holds period-end dates; the final
    /// (possibly incomplete) period is labelled with its period end too.
    pub fn resample_last(&self, freq: Frequency) -> Self {
        let mut out_index: Vec<NaiveDate> = Vec::new();
        let mut out_cols: Vec<Vec<f64>> = vec![Vec::new(); self.width()];
        for (row, date) in self.index.iter().enumerate() {
            let bucket = freq.period_end(*date);
            if out_index.last() != Some(&bucket) {
                out_index.push(bucket);
                for col in out_cols.iter_mut() {
                    col.push(f64::NAN);
                }
            }
            for (c, col) in self.columns.iter().enumerate() {
                let v = col[row];
                if !v.is_nan() {
                    if let Some(slot) = out_cols[c].last_mut() {
                        *slot = v;
                    }
                }
            }
        }
        Self::from_parts(out_index, self.names.clone(), out_cols)
    }

    /// Simple period returns `p[t] / p[t-1] - 1`; the first row is `NaN`.
    pub fn returns(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut out = Vec::with_capacity(c.len());
                for i in 0..c.len() {
                    if i == 0 || c[i - 1] == 0.0 {
                        out.push(f64::NAN);
                    } else {
                        out.push(c[i] / c[i - 1] - 1.0);
                    }
                }
                out
            })
            .collect();
        Self::from_parts(self.index.clone(), self.names.clone(), columns)
    }

    /// Compound returns into a NAV starting from `1 + r[0]`; `NaN` returns
    /// count as flat.
    pub fn compound(&self) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut nav = 1.0;
                c.iter()
                    .map(|r| {
                        if !r.is_nan() {
                            nav *= 1.0 + r;
                        }
                        nav
                    })
                    .collect()
            })
            .collect();
        Self::from_parts(self.index.clone(), self.names.clone(), columns)
    }

    /// Drop rows where every column is `NaN`.
    pub fn drop_all_nan_rows(&self) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&r| self.columns.iter().any(|c| !c[r].is_nan()))
            .collect();
        self.take_rows(&keep)
    }

    /// Drop rows where any column is `NaN`.
    pub fn drop_any_nan_rows(&self) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&r| self.columns.iter().all(|c| !c[r].is_nan()))
            .collect();
        self.take_rows(&keep)
    }

    /// Names of columns that hold no observation at all.
    pub fn degenerate_columns(&self) -> Vec<&str> {
        self.iter_columns()
            .filter(|(_, c)| c.iter().all(|v| v.is_nan()))
            .map(|(n, _)| n)
            .collect()
    }

    /// True when there is nothing plottable: no rows, no columns, or every
    /// column is entirely `NaN`.
    pub fn is_degenerate(&self) -> bool {
        self.is_empty() || self.width() == 0 || self.degenerate_columns().len() == self.width()
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        let index = rows.iter().map(|&r| self.index[r]).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| rows.iter().map(|&r| c[r]).collect())
            .collect();
        Self::from_parts(index, self.names.clone(), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> TimeSeriesTable {
        TimeSeriesTable::new(
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03"), d("2024-01-04")],
            vec![
                ("a".into(), vec![1.0, f64::NAN, 3.0, 4.0]),
                ("b".into(), vec![f64::NAN, 2.0, f64::NAN, 1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn sub_aligned_keeps_one_sided_cells_missing() {
        let left = TimeSeriesTable::new(
            vec![d("2024-01-01"), d("2024-01-02")],
            vec![("ES".into(), vec![1.0, 2.0]), ("TY".into(), vec![0.5, 0.5])],
        )
        .unwrap();
        let right = TimeSeriesTable::new(
            vec![d("2024-01-02"), d("2024-01-03")],
            vec![("ES".into(), vec![0.5, 1.0]), ("GC".into(), vec![3.0, 3.0])],
        )
        .unwrap();
        let diff = left.sub_aligned(&right).unwrap();
        assert_eq!(diff.index(), &[d("2024-01-01"), d("2024-01-02"), d("2024-01-03")]);
        let es = diff.column("ES").unwrap();
        assert!(es[0].is_nan());
        assert_eq!(es[1], 1.5);
        assert!(es[2].is_nan());
        assert!(diff.column("GC").unwrap().iter().all(|v| v.is_nan()));
        assert!(diff.column("TY").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rejects_unsorted_index() {
        let err = TimeSeriesTable::from_series(
            "x",
            vec![d("2024-01-02"), d("2024-01-01")],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::UnsortedIndex { row: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = TimeSeriesTable::from_series(
            "x",
            vec![d("2024-01-01"), d("2024-01-01")],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::UnsortedIndex { .. }));
    }

    #[test]
    fn rejects_length_mismatch_and_duplicates() {
        let idx = vec![d("2024-01-01")];
        assert!(matches!(
            TimeSeriesTable::new(idx.clone(), vec![("x".into(), vec![1.0, 2.0])]),
            Err(TableError::LengthMismatch { .. })
        ));
        assert!(matches!(
            TimeSeriesTable::new(
                idx,
                vec![("x".into(), vec![1.0]), ("x".into(), vec![2.0])]
            ),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn ffill_keeps_leading_nan() {
        let t = sample().ffill();
        assert_eq!(t.column("a").unwrap(), &[1.0, 1.0, 3.0, 4.0]);
        let b = t.column("b").unwrap();
        assert!(b[0].is_nan());
        assert_eq!(&b[1..], &[2.0, 2.0, 1.0]);
    }

    #[test]
    fn cumsum_skips_nan() {
        let t = sample().cumsum();
        let a = t.column("a").unwrap();
        assert_eq!(a[0], 1.0);
        assert!(a[1].is_nan());
        assert_eq!(a[2], 4.0);
        assert_eq!(a[3], 8.0);
    }

    #[test]
    fn rolling_sum_needs_full_window() {
        let t = TimeSeriesTable::from_series(
            "x",
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03"), d("2024-01-04")],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let r = t.rolling_sum(2).unwrap();
        let x = r.column("x").unwrap();
        assert!(x[0].is_nan());
        assert_eq!(&x[1..], &[3.0, 5.0, 7.0]);
        assert_eq!(t.rolling_sum(0), Err(TableError::EmptyWindow));
    }

    #[test]
    fn row_sum_skips_nan() {
        let s = sample().row_sum("total");
        assert_eq!(s.column("total").unwrap(), &[1.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn locate_is_inclusive() {
        let p = TimePeriod::new(Some(d("2024-01-02")), Some(d("2024-01-03")));
        let t = sample().locate(&p);
        assert_eq!(t.index(), &[d("2024-01-02"), d("2024-01-03")]);
    }

    #[test]
    fn sub_requires_same_shape() {
        let a = sample();
        let b = a.select(&["a"]).unwrap();
        assert!(matches!(a.sub(&b), Err(TableError::ShapeMismatch(_))));
        let zero = a.fill_nan(0.0).sub(&a.fill_nan(0.0)).unwrap();
        assert!(zero.column("a").unwrap().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn returns_and_compound() {
        let p = TimeSeriesTable::from_series(
            "p",
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")],
            vec![100.0, 110.0, 99.0],
        )
        .unwrap();
        let r = p.returns();
        let rv = r.column("p").unwrap();
        assert!(rv[0].is_nan());
        assert!((rv[1] - 0.1).abs() < 1e-12);
        assert!((rv[2] + 0.1).abs() < 1e-12);
        let nav = r.compound();
        let nv = nav.column("p").unwrap();
        assert!((nv[2] - 0.99).abs() < 1e-12);
    }

    #[test]
    fn degenerate_detection() {
        let t = TimeSeriesTable::from_series(
            "x",
            vec![d("2024-01-01")],
            vec![f64::NAN],
        )
        .unwrap();
        assert!(t.is_degenerate());
        assert!(!sample().is_degenerate());
    }

    #[test]
    fn resample_last_takes_last_valid() {
        let t = TimeSeriesTable::from_series(
            "x",
            vec![d("2024-01-30"), d("2024-01-31"), d("2024-02-01"), d("2024-02-15")],
            vec![1.0, f64::NAN, 3.0, 4.0],
        )
        .unwrap();
        let m = t.resample_last(Frequency::MonthEnd);
        assert_eq!(m.index(), &[d("2024-01-31"), d("2024-02-29")]);
        assert_eq!(m.column("x").unwrap(), &[1.0, 4.0]);
    }

    #[test]
    fn insert_and_prefix() {
        let t = sample()
            .insert_column(0, "z", vec![0.0; 4])
            .unwrap()
            .prefix_columns("pf");
        assert_eq!(t.names(), &["pf-z", "pf-a", "pf-b"]);
    }
}
