use polars::prelude::DataFrame;
use tracing::debug;

use crate::dataset::numeric_column;
use crate::error::{MetricsError, Result};
use crate::types::{
    ABSOLUTE_ERROR_COLUMN, ACTUAL_COLUMN, ERROR_COLUMN, MetricsSummary, PERCENTAGE_ERROR_COLUMN,
};
use crate::utils::{sorted_mean, sorted_sum};

/// Reduce rows augmented by [`compute_row_errors`](super::compute_row_errors)
/// to aggregate accuracy metrics.
///
/// - `MAPE = mean(Percentage_Error) * 100`
/// - `WMAPE = sum(Absolute_Error) / sum(Actual) * 100`
/// - `BIAS = mean(Error)`
///
/// An empty dataset fails with [`MetricsError::NoData`]; a dataset whose
/// actual values sum to zero fails with [`MetricsError::ZeroActualSum`].
pub fn compute_summary(df: &DataFrame) -> Result<MetricsSummary> {
    let rows = df.height();
    if rows == 0 {
        return Err(MetricsError::NoData);
    }

    let actual = numeric_column(df, ACTUAL_COLUMN)?;
    let errors = numeric_column(df, ERROR_COLUMN)?;
    let absolute_errors = numeric_column(df, ABSOLUTE_ERROR_COLUMN)?;
    let percentage_errors = numeric_column(df, PERCENTAGE_ERROR_COLUMN)?;

    let actual_sum = sorted_sum(&actual);
    if actual_sum == 0.0 {
        return Err(MetricsError::ZeroActualSum { rows });
    }

    let mape = sorted_mean(&percentage_errors).ok_or(MetricsError::NoData)? * 100.0;
    let wmape = sorted_sum(&absolute_errors) / actual_sum * 100.0;
    let bias = sorted_mean(&errors).ok_or(MetricsError::NoData)?;

    debug!(
        "Summary over {} rows: MAPE={:.4}, WMAPE={:.4}, BIAS={:.4}",
        rows, mape, wmape, bias
    );
    Ok(MetricsSummary::new(mape, wmape, bias))
}
