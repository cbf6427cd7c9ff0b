use super::{TableError, TimeSeriesTable};
use std::collections::HashSet;

/// Table indexed by category labels instead of dates.
///
/// Used as bar-chart input: rows are categories (instruments, strategies,
/// formatted dates) and columns are the series drawn per category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    labels: Vec<String>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl CategoryTable {
    pub fn new(
        labels: Vec<String>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (name, data) in columns {
            if data.len() != labels.len() {
                return Err(TableError::LengthMismatch {
                    column: name,
                    expected: labels.len(),
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
            labels,
            names,
            columns: values,
        })
    }

    /// Build from rows of `(label, values)`; every row must have one value
    /// per column name.
    pub fn from_rows(
        names: Vec<String>,
        rows: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        let mut labels = Vec::with_capacity(rows.len());
        let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
        for (label, values) in rows {
            if values.len() != names.len() {
                return Err(TableError::LengthMismatch {
                    column: label,
                    expected: names.len(),
                    actual: values.len(),
                });
            }
            for (c, v) in values.into_iter().enumerate() {
                columns[c].push(v);
            }
            labels.push(label);
        }
        Self::new(labels, names.into_iter().zip(columns).collect())
    }

    /// Single series keyed by label.
    pub fn from_series(name: impl Into<String>, points: Vec<(String, f64)>) -> Self {
        let (labels, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        Self {
            labels,
            names: vec![name.into()],
            columns: vec![values],
        }
    }

    /// Convert a time-indexed table, formatting dates with a strftime pattern.
    pub fn from_time_series(table: &TimeSeriesTable, date_format: &str) -> Self {
        Self {
            labels: table
                .index()
                .iter()
                .map(|d| d.format(date_format).to_string())
                .collect(),
            names: table.names().to_vec(),
            columns: table.iter_columns().map(|(_, c)| c.to_vec()).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn column_at(&self, i: usize) -> &[f64] {
        &self.columns[i]
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.columns[col][row]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[row]).collect()
    }

    /// Replace row labels (e.g. to append totals).
    pub fn with_labels(&self, labels: Vec<String>) -> Result<Self, TableError> {
        if labels.len() != self.len() {
            return Err(TableError::ShapeMismatch(format!(
                "{} labels for {} rows",
                labels.len(),
                self.len()
            )));
        }
        let mut out = self.clone();
        out.labels = labels;
        Ok(out)
    }

    /// Outer-join columns of several tables on their labels, keeping the
    /// first-seen label order. Missing cells are `NaN`.
    pub fn concat_columns(tables: &[CategoryTable]) -> Result<Self, TableError> {
        let mut labels: Vec<String> = Vec::new();
        for t in tables {
            for l in &t.labels {
                if !labels.contains(l) {
                    labels.push(l.clone());
                }
            }
        }
        let mut columns = Vec::new();
        for t in tables {
            for (c, name) in t.names.iter().enumerate() {
                let values = labels
                    .iter()
                    .map(|l| {
                        t.labels
                            .iter()
                            .position(|x| x == l)
                            .map(|r| t.columns[c][r])
                            .unwrap_or(f64::NAN)
                    })
                    .collect();
                columns.push((name.clone(), values));
            }
        }
        Self::new(labels, columns)
    }

    /// Stable sort of rows by one column; `NaN` sorts last.
    pub fn sort_by_column(&self, col: usize, descending: bool) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        let key = &self.columns[col];
        order.sort_by(|&a, &b| {
            let (x, y) = (key[a], key[b]);
            match (x.is_nan(), y.is_nan()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => {
                    let ord = x.total_cmp(&y);
                    if descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
            }
        });
        self.take_rows(&order)
    }

    /// Drop rows where every value is zero or `NaN`.
    pub fn drop_rows_all_zero_or_nan(&self) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&r| self.columns.iter().any(|c| !c[r].is_nan() && c[r] != 0.0))
            .collect();
        self.take_rows(&keep)
    }

    /// Swap rows and columns.
    pub fn transpose(&self) -> Self {
        Self {
            labels: self.names.clone(),
            names: self.labels.clone(),
            columns: (0..self.len()).map(|r| self.row(r)).collect(),
        }
    }

    /// Drop the row with the given label, if any.
    pub fn drop_row(&self, label: &str) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&r| self.labels[r] != label)
            .collect();
        self.take_rows(&keep)
    }

    /// Per-row sum across columns (naive: `NaN` propagates).
    pub fn row_totals(&self) -> Vec<f64> {
        (0..self.len())
            .map(|r| self.columns.iter().map(|c| c[r]).sum())
            .collect()
    }

    /// All cells in column-major order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.columns.iter().flat_map(|c| c.iter().copied())
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            labels: rows.iter().map(|&r| self.labels[r].clone()).collect(),
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| rows.iter().map(|&r| c[r]).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        CategoryTable::from_rows(
            vec!["p1".into(), "p2".into()],
            vec![
                ("a".into(), vec![0.1, 0.0]),
                ("b".into(), vec![0.0, 0.0]),
                ("c".into(), vec![0.3, f64::NAN]),
                ("d".into(), vec![f64::NAN, f64::NAN]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn drops_rows_without_signal() {
        let t = table().drop_rows_all_zero_or_nan();
        assert_eq!(t.labels(), &["a", "c"]);
    }

    #[test]
    fn sorts_descending_nan_last() {
        let t = table().sort_by_column(0, true);
        assert_eq!(t.labels(), &["c", "a", "b", "d"]);
    }

    #[test]
    fn concat_aligns_labels() {
        let x = CategoryTable::from_series("x", vec![("a".into(), 1.0), ("b".into(), 2.0)]);
        let y = CategoryTable::from_series("y", vec![("b".into(), 3.0), ("c".into(), 4.0)]);
        let t = CategoryTable::concat_columns(&[x, y]).unwrap();
        assert_eq!(t.labels(), &["a", "b", "c"]);
        assert!(t.column("y").unwrap()[0].is_nan());
        assert_eq!(t.column("y").unwrap()[1], 3.0);
    }

    #[test]
    fn drop_row_by_label() {
        let t = table().drop_row("b");
        assert_eq!(t.labels(), &["a", "c", "d"]);
        assert_eq!(table().drop_row("zz").len(), 4);
    }

    #[test]
    fn transpose_swaps_axes() {
        let t = table().transpose();
        assert_eq!(t.labels(), &["p1", "p2"]);
        assert_eq!(t.names(), &["a", "b", "c", "d"]);
        assert_eq!(t.value(0, 2), 0.3);
        assert!(t.value(1, 2).is_nan());
    }

    #[test]
    fn row_totals_are_naive() {
        let t = table();
        let totals = t.row_totals();
        assert!((totals[0] - 0.1).abs() < 1e-12);
        assert!(totals[2].is_nan());
    }
}
