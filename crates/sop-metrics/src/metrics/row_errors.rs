use polars::prelude::*;
use tracing::debug;

use crate::dataset::{integer_column, numeric_column};
use crate::error::{MetricsError, Result};
use crate::types::{
    ABSOLUTE_ERROR_COLUMN, ACTUAL_COLUMN, ERROR_COLUMN, FORECAST_COLUMN, PERCENTAGE_ERROR_COLUMN,
};

/// Error fields of a single row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowError {
    /// `forecast - actual`
    pub error: f64,
    /// `|error|`
    pub absolute_error: f64,
    /// `absolute_error / actual` as a fraction; `0` when `actual` is zero.
    pub percentage_error: f64,
}

impl RowError {
    pub fn new(actual: f64, forecast: f64) -> Self {
        let error = forecast - actual;
        let absolute_error = error.abs();
        let percentage_error = if actual == 0.0 {
            0.0
        } else {
            absolute_error / actual
        };

        Self {
            error,
            absolute_error,
            percentage_error,
        }
    }
}

/// Validate `Actual` and `Forecast` and return a copy of `df` with the
/// `Error`, `Absolute_Error` and `Percentage_Error` columns appended.
///
/// When both inputs are integer columns, `Error` and `Absolute_Error` are
/// `Int64` and exact; otherwise all three columns are `Float64`.
///
/// Fails with a validation error naming the first offending row when a
/// value is missing, non-numeric, non-finite, or when `Actual` is negative.
/// Existing error columns are overwritten.
pub fn compute_row_errors(df: &DataFrame) -> Result<DataFrame> {
    let (actual, forecast) = validated_pairs(df)?;

    let zero_rows = actual.iter().filter(|a| **a == 0.0).count();
    if zero_rows > 0 {
        debug!(
            "{} rows have zero actual demand; their percentage error is set to 0",
            zero_rows
        );
    }

    let exact = match (
        integer_column(df, ACTUAL_COLUMN)?,
        integer_column(df, FORECAST_COLUMN)?,
    ) {
        (Some(actual), Some(forecast)) => Some(exact_row_errors(&actual, &forecast)?),
        _ => None,
    };

    let mut augmented = df.clone();
    if let Some((errors, absolute_errors, percentage_errors)) = exact {
        augmented.with_column(Series::new(ERROR_COLUMN.into(), errors))?;
        augmented.with_column(Series::new(ABSOLUTE_ERROR_COLUMN.into(), absolute_errors))?;
        augmented.with_column(Series::new(PERCENTAGE_ERROR_COLUMN.into(), percentage_errors))?;
    } else {
        let mut errors = Vec::with_capacity(actual.len());
        let mut absolute_errors = Vec::with_capacity(actual.len());
        let mut percentage_errors = Vec::with_capacity(actual.len());

        for (a, f) in actual.iter().zip(&forecast) {
            let row = RowError::new(*a, *f);
            errors.push(row.error);
            absolute_errors.push(row.absolute_error);
            percentage_errors.push(row.percentage_error);
        }

        augmented.with_column(Series::new(ERROR_COLUMN.into(), errors))?;
        augmented.with_column(Series::new(ABSOLUTE_ERROR_COLUMN.into(), absolute_errors))?;
        augmented.with_column(Series::new(PERCENTAGE_ERROR_COLUMN.into(), percentage_errors))?;
    }

    debug!("Computed row errors for {} rows", augmented.height());
    Ok(augmented)
}

/// Integer inputs keep `Error` and `Absolute_Error` in `i64`, so they stay
/// exact beyond 2^53. A difference outside the `i64` range is rejected.
fn exact_row_errors(
    actual: &[i64],
    forecast: &[i64],
) -> Result<(Vec<i64>, Vec<i64>, Vec<f64>)> {
    let mut errors = Vec::with_capacity(actual.len());
    let mut absolute_errors = Vec::with_capacity(actual.len());
    let mut percentage_errors = Vec::with_capacity(actual.len());

    for (row, (a, f)) in actual.iter().zip(forecast).enumerate() {
        let error = f
            .checked_sub(*a)
            .and_then(|error| error.checked_abs().map(|abs| (error, abs)));
        let (error, absolute_error) = error.ok_or_else(|| {
            MetricsError::validation(
                row,
                FORECAST_COLUMN,
                "error exceeds the 64-bit integer range",
            )
        })?;

        errors.push(error);
        absolute_errors.push(absolute_error);
        percentage_errors.push(if *a == 0 {
            0.0
        } else {
            absolute_error as f64 / *a as f64
        });
    }

    Ok((errors, absolute_errors, percentage_errors))
}

/// Number of rows whose `Actual` value is zero.
pub fn zero_actual_rows(df: &DataFrame) -> Result<usize> {
    let actual = numeric_column(df, ACTUAL_COLUMN)?;
    Ok(actual.iter().filter(|a| **a == 0.0).count())
}

/// Extract both input columns, reporting the lowest offending row when
/// both contain bad values.
fn validated_pairs(df: &DataFrame) -> Result<(Vec<f64>, Vec<f64>)> {
    let actual = numeric_column(df, ACTUAL_COLUMN).and_then(|values| {
        match values.iter().position(|v| *v < 0.0) {
            Some(row) => Err(MetricsError::validation(
                row,
                ACTUAL_COLUMN,
                format!("negative actual value {}", values[row]),
            )),
            None => Ok(values),
        }
    });
    let forecast = numeric_column(df, FORECAST_COLUMN);

    match (actual, forecast) {
        (Ok(actual), Ok(forecast)) => Ok((actual, forecast)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(a), Err(f)) => match (a.row_index(), f.row_index()) {
            (Some(ra), Some(rf)) if rf < ra => Err(f),
            _ => Err(a),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column_values(df: &DataFrame, name: &str) -> Vec<f64> {
        numeric_column(df, name).unwrap()
    }

    #[test]
    fn test_row_error_basic() {
        let row = RowError::new(100.0, 110.0);
        assert_eq!(row.error, 10.0);
        assert_eq!(row.absolute_error, 10.0);
        assert_eq!(row.percentage_error, 0.1);
    }

    #[test]
    fn test_row_error_zero_actual() {
        let row = RowError::new(0.0, 50.0);
        assert_eq!(row.error, 50.0);
        assert_eq!(row.percentage_error, 0.0);
    }

    #[test]
    fn test_compute_row_errors_appends_columns() {
        let df = df![
            "Date" => ["2023-01-01", "2023-01-02"],
            "Actual" => [100i64, 200],
            "Forecast" => [110i64, 180],
        ]
        .unwrap();

        let augmented = compute_row_errors(&df).unwrap();

        assert_eq!(augmented.width(), 6);
        assert_eq!(column_values(&augmented, ERROR_COLUMN), vec![10.0, -20.0]);
        assert_eq!(column_values(&augmented, ABSOLUTE_ERROR_COLUMN), vec![10.0, 20.0]);
        assert_eq!(column_values(&augmented, PERCENTAGE_ERROR_COLUMN), vec![0.1, 0.1]);
        // input untouched
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_compute_row_errors_is_idempotent() {
        let df = df!["Actual" => [100i64], "Forecast" => [90i64]].unwrap();
        let once = compute_row_errors(&df).unwrap();
        let twice = compute_row_errors(&once).unwrap();
        assert_eq!(once.width(), twice.width());
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_integer_errors_are_exact() {
        let df = df![
            "Actual" => [9_007_199_254_740_993i64],
            "Forecast" => [9_007_199_254_740_992i64],
        ]
        .unwrap();
        let augmented = compute_row_errors(&df).unwrap();

        let error = augmented.column(ERROR_COLUMN).unwrap();
        assert_eq!(error.dtype(), &DataType::Int64);
        assert_eq!(error.as_materialized_series().i64().unwrap().get(0), Some(-1));

        let absolute = augmented.column(ABSOLUTE_ERROR_COLUMN).unwrap();
        assert_eq!(absolute.as_materialized_series().i64().unwrap().get(0), Some(1));
    }

    #[test]
    fn test_float_inputs_give_float_errors() {
        let df = df!["Actual" => [100.0f64], "Forecast" => [110.5f64]].unwrap();
        let augmented = compute_row_errors(&df).unwrap();

        assert_eq!(augmented.column(ERROR_COLUMN).unwrap().dtype(), &DataType::Float64);
        assert_eq!(column_values(&augmented, ERROR_COLUMN), vec![10.5]);
    }

    #[test]
    fn test_integer_error_overflow_is_rejected() {
        let df = df!["Actual" => [5i64, 1], "Forecast" => [4i64, i64::MIN]].unwrap();
        let err = compute_row_errors(&df).unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(err.row_index(), Some(1));
    }

    #[test]
    fn test_malformed_text_is_rejected() {
        let df = df!["Actual" => ["1,5", "12%"], "Forecast" => ["2", "3"]].unwrap();
        let err = compute_row_errors(&df).unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(err.row_index(), Some(0));
        assert!(err.to_string().contains("non-numeric value \"1,5\""));
    }

    #[test]
    fn test_negative_forecast_is_allowed() {
        let df = df!["Actual" => [10i64], "Forecast" => [-5i64]].unwrap();
        let augmented = compute_row_errors(&df).unwrap();
        assert_eq!(column_values(&augmented, ERROR_COLUMN), vec![-15.0]);
        assert_eq!(column_values(&augmented, PERCENTAGE_ERROR_COLUMN), vec![1.5]);
    }

    #[test]
    fn test_negative_actual_is_rejected() {
        let df = df!["Actual" => [10i64, -1], "Forecast" => [5i64, 5]].unwrap();
        let err = compute_row_errors(&df).unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(err.row_index(), Some(1));
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_lowest_offending_row_is_reported() {
        let df = df![
            "Actual" => [Some(1i64), Some(2), None],
            "Forecast" => [Some(1i64), None, Some(3)],
        ]
        .unwrap();
        let err = compute_row_errors(&df).unwrap_err();
        assert_eq!(err.row_index(), Some(1));
        assert!(err.to_string().contains("Forecast"));
    }

    #[test]
    fn test_missing_forecast_column() {
        let df = df!["Actual" => [1i64]].unwrap();
        let err = compute_row_errors(&df).unwrap_err();
        assert!(matches!(err, MetricsError::ColumnNotFound(_)));
    }

    #[test]
    fn test_zero_actual_rows() {
        let df = df!["Actual" => [0i64, 5, 0], "Forecast" => [1i64, 5, 2]].unwrap();
        assert_eq!(zero_actual_rows(&df).unwrap(), 2);
    }
}
