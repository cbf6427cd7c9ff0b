//! Time-indexed and categorical numeric tables.
//!
//! `TimeSeriesTable` is the unit of exchange between portfolio results, the
//! aggregator and the chart routines. Missing observations are `NaN`; nothing
//! is ever coerced to zero unless a call site asks for `Fill::Zero` or
//! `fill_nan(0.0)` explicitly.

pub mod align;
mod category;
mod series;

pub use align::{align_outer, concat_columns, union_index, Fill};
pub use category::CategoryTable;
pub use series::TimeSeriesTable;

use chrono::NaiveDate;
use thiserror::Error;

/// Structural errors raised while building or combining tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("index is not strictly increasing at row {row} ({date})")]
    UnsortedIndex { row: usize, date: NaiveDate },

    #[error("column '{column}' has {actual} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("rolling window must be at least 1")]
    EmptyWindow,
}
