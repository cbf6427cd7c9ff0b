//! Polars interop: `TimeSeriesTable` to and from `DataFrame`, plus Parquet I/O.
//!
//! Frames carry a `date` column (polars `Date`) followed by one numeric
//! column per series. Nulls read back as `NaN`.

use crate::table::{TableError, TimeSeriesTable};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DATE_COLUMN: &str = "date";

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("polars error: {0}")]
    Polars(String),

    #[error("missing '{DATE_COLUMN}' column")]
    MissingDate,

    #[error("null date at row {0}")]
    NullDate(usize),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Convert a table into a DataFrame with a leading `date` column.
pub fn to_dataframe(table: &TimeSeriesTable) -> Result<DataFrame, FrameError> {
    let days: Vec<i32> = table
        .index()
        .iter()
        .map(|d| (*d - epoch()).num_days() as i32)
        .collect();
    let mut columns = Vec::with_capacity(table.width() + 1);
    columns.push(
        Column::new(DATE_COLUMN.into(), days)
            .cast(&DataType::Date)
            .map_err(|e| FrameError::Polars(format!("date cast: {e}")))?,
    );
    for (name, values) in table.iter_columns() {
        columns.push(Column::new(name.into(), values.to_vec()));
    }
    DataFrame::new(columns).map_err(|e| FrameError::Polars(format!("dataframe creation: {e}")))
}

/// Convert a DataFrame back into a table. Every non-date column is cast
/// to `f64`; rows are expected in ascending date order.
pub fn from_dataframe(df: &DataFrame) -> Result<TimeSeriesTable, FrameError> {
    let map_err = |e: PolarsError| FrameError::Polars(format!("column read: {e}"));

    let dates = df.column(DATE_COLUMN).map_err(|_| FrameError::MissingDate)?;
    let dates = dates
        .cast(&DataType::Date)
        .map_err(|e| FrameError::Polars(format!("date column type: {e}")))?;
    let date_ca = dates.date().map_err(map_err)?;

    let mut index = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca.get(i).ok_or(FrameError::NullDate(i))?;
        index.push(epoch() + chrono::Duration::days(days as i64));
    }

    let mut columns = Vec::with_capacity(df.width().saturating_sub(1));
    for column in df.get_columns() {
        if column.name().as_str() == DATE_COLUMN {
            continue;
        }
        let cast = column.cast(&DataType::Float64).map_err(map_err)?;
        let ca = cast.f64().map_err(map_err)?;
        let values = (0..df.height())
            .map(|i| ca.get(i).unwrap_or(f64::NAN))
            .collect();
        columns.push((column.name().to_string(), values));
    }

    Ok(TimeSeriesTable::new(index, columns)?)
}

pub fn write_parquet(table: &TimeSeriesTable, path: &Path) -> Result<(), FrameError> {
    let mut df = to_dataframe(table)?;
    let file = fs::File::create(path).map_err(|source| FrameError::Io {
        path: path.display().to_string(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| FrameError::Polars(format!("write parquet: {e}")))?;
    tracing::debug!(path = %path.display(), rows = table.len(), "wrote parquet");
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<TimeSeriesTable, FrameError> {
    let file = fs::File::open(path).map_err(|source| FrameError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| FrameError::Polars(format!("read parquet: {e}")))?;
    from_dataframe(&df)
}
