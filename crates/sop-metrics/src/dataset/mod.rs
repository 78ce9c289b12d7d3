//! Dataset construction, ingestion and validated column access.
//!
//! The metrics engine works on a polars [`DataFrame`] with the columns
//! `Date`, `Actual` and `Forecast`. Any [`DatasetSource`] can feed it: the
//! seeded [`SyntheticDataGenerator`] or a [`CsvDatasetSource`].

mod csv;
mod generator;

pub use csv::{CsvDatasetSource, load_csv, normalize_column_names, save_csv};
pub use generator::SyntheticDataGenerator;

use crate::error::{MetricsError, Result};
use crate::types::{ACTUAL_COLUMN, DATE_COLUMN, FORECAST_COLUMN, TimeSeriesRow};
use crate::utils::{is_missing_marker, is_numeric_dtype, is_text_dtype, parse_numeric_string};
use polars::prelude::*;

/// A producer of `(Date, Actual, Forecast)` tables.
///
/// Implementations must be `Send + Sync` so a pipeline holding one can be
/// moved to a worker thread.
pub trait DatasetSource: Send + Sync {
    /// Produce a fresh dataset snapshot.
    fn load(&self) -> Result<DataFrame>;

    /// Short human-readable description used in reports and logs.
    fn describe(&self) -> String;
}

/// Build a dataset frame from typed rows.
pub fn rows_to_dataframe(rows: &[TimeSeriesRow]) -> Result<DataFrame> {
    let dates: Vec<chrono::NaiveDate> = rows.iter().map(|row| row.date).collect();
    let actual: Vec<i64> = rows.iter().map(|row| row.actual).collect();
    let forecast: Vec<i64> = rows.iter().map(|row| row.forecast).collect();

    let df = DataFrame::new(vec![
        Series::new(DATE_COLUMN.into(), dates).into_column(),
        Series::new(ACTUAL_COLUMN.into(), actual).into_column(),
        Series::new(FORECAST_COLUMN.into(), forecast).into_column(),
    ])?;
    Ok(df)
}

/// Extract a column as validated `f64` values.
///
/// Integer and float columns are cast; text columns must hold plain
/// decimals, optionally with thousands separators (`"1,234"`). The first
/// offending row aborts the extraction:
///
/// - null or a missing marker such as `"N/A"` → "missing value"
/// - unparsable text → "non-numeric value"
/// - NaN or infinity → "non-finite value"
/// - any other dtype → reported at row 0
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| MetricsError::ColumnNotFound(name.to_string()))?;
    let dtype = column.dtype().clone();

    if is_numeric_dtype(&dtype) {
        let casted = column.cast(&DataType::Float64)?;
        let values = casted.as_materialized_series().f64()?;

        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                None => Err(MetricsError::validation(row, name, "missing value")),
                Some(v) if !v.is_finite() => Err(MetricsError::validation(
                    row,
                    name,
                    format!("non-finite value {}", v),
                )),
                Some(v) => Ok(v),
            })
            .collect()
    } else if is_text_dtype(&dtype) {
        let casted = column.cast(&DataType::String)?;
        let values = casted.as_materialized_series().str()?;

        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let text = match value {
                    Some(text) if !is_missing_marker(text) => text,
                    _ => return Err(MetricsError::validation(row, name, "missing value")),
                };
                match parse_numeric_string(text) {
                    Some(v) if v.is_finite() => Ok(v),
                    Some(v) => Err(MetricsError::validation(
                        row,
                        name,
                        format!("non-finite value {}", v),
                    )),
                    None => Err(MetricsError::validation(
                        row,
                        name,
                        format!("non-numeric value \"{}\"", text.trim()),
                    )),
                }
            })
            .collect()
    } else {
        Err(MetricsError::validation(
            0,
            name,
            format!("unsupported column type {}", dtype),
        ))
    }
}

/// Extract an integer column as exact `i64` values.
///
/// Returns `None` for float, text and `UInt64` columns, whose values may not
/// fit or are not integers; use [`numeric_column`] for those.
pub fn integer_column(df: &DataFrame, name: &str) -> Result<Option<Vec<i64>>> {
    let column = df
        .column(name)
        .map_err(|_| MetricsError::ColumnNotFound(name.to_string()))?;

    let exact = matches!(
        column.dtype(),
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
    );
    if !exact {
        return Ok(None);
    }

    let casted = column.cast(&DataType::Int64)?;
    let values = casted
        .as_materialized_series()
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| MetricsError::validation(row, name, "missing value"))
        })
        .collect::<Result<Vec<i64>>>()?;
    Ok(Some(values))
}
