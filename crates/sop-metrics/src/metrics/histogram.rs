use polars::prelude::DataFrame;
use tracing::debug;

use crate::dataset::numeric_column;
use crate::error::{MetricsError, Result};
use crate::types::{ERROR_COLUMN, ErrorHistogram, HistogramBin};
use crate::utils::{format_bound, round_frac};

/// Share of the range the first edge is lowered by so the minimum falls
/// inside the first right-closed interval.
const LOWER_EDGE_ADJUSTMENT: f64 = 0.001;

/// Relative half-width of the range used when every value is identical.
const DEGENERATE_WIDENING: f64 = 0.001;

/// Digits kept in interval labels before they are forced to be distinct.
const LABEL_PRECISION: u32 = 3;

/// Bin the `Error` column of an augmented dataset into `bin_count`
/// equal-width, right-closed intervals.
pub fn compute_error_histogram(df: &DataFrame, bin_count: usize) -> Result<ErrorHistogram> {
    let errors = numeric_column(df, ERROR_COLUMN)?;
    bin_values(&errors, bin_count)
}

/// Bin finite values into `bin_count` equal-width intervals `(lo, hi]`.
///
/// Edges are `linspace(min, max, bin_count + 1)` with the first edge
/// lowered by 0.1% of the range, so the minimum lands in the first bin and
/// the maximum in the last. When every value equals `v` the range is
/// widened to `v ± 0.001·|v|` (`±0.001` for zero) and the histogram is
/// flagged as `widened`; all values then fall into a single bin.
///
/// Labels round both edges to three decimals (more if needed to keep them
/// distinct), e.g. `"(6.993, 6.996]"`.
pub fn bin_values(values: &[f64], bin_count: usize) -> Result<ErrorHistogram> {
    if bin_count == 0 {
        return Err(MetricsError::InvalidBinCount(bin_count));
    }
    if values.is_empty() {
        return Err(MetricsError::NoData);
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });

    let widened = min == max;
    let edges = if widened {
        let (lo, hi) = widened_range(min);
        debug!(
            "All {} values equal {}; widening histogram range to [{}, {}]",
            values.len(),
            min,
            lo,
            hi
        );
        linspace(lo, hi, bin_count)
    } else {
        let mut edges = linspace(min, max, bin_count);
        let range = max - min;
        edges[0] -= if range.is_finite() {
            range * LOWER_EDGE_ADJUSTMENT
        } else {
            max * LOWER_EDGE_ADJUSTMENT - min * LOWER_EDGE_ADJUSTMENT
        };
        edges
    };

    let mut counts = vec![0usize; bin_count];
    for value in values {
        counts[bin_index(&edges, *value)] += 1;
    }

    let rounded = rounded_edges(&edges);
    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: edges[i],
            upper: edges[i + 1],
            label: format!(
                "({}, {}]",
                format_bound(rounded[i]),
                format_bound(rounded[i + 1])
            ),
            count,
        })
        .collect();

    Ok(ErrorHistogram { bins, widened })
}

fn widened_range(value: f64) -> (f64, f64) {
    let half_width = if value == 0.0 {
        DEGENERATE_WIDENING
    } else {
        value.abs() * DEGENERATE_WIDENING
    };
    let (lo, hi) = (value - half_width, value + half_width);

    // subnormal inputs can lose the relative widening entirely
    if lo < hi {
        (lo, hi)
    } else {
        (value - DEGENERATE_WIDENING, value + DEGENERATE_WIDENING)
    }
}

/// `bin_count + 1` evenly spaced edges; the last one is exactly `stop`.
///
/// Ranges wider than `f64::MAX` are interpolated so no edge overflows.
fn linspace(start: f64, stop: f64, bin_count: usize) -> Vec<f64> {
    let n = bin_count as f64;
    let step = (stop - start) / n;
    let mut edges: Vec<f64> = if step.is_finite() {
        (0..=bin_count).map(|i| start + step * i as f64).collect()
    } else {
        (0..=bin_count)
            .map(|i| {
                let t = i as f64 / n;
                start * (1.0 - t) + stop * t
            })
            .collect()
    };
    edges[bin_count] = stop;
    edges
}

/// Index of the right-closed interval containing `value`.
fn bin_index(edges: &[f64], value: f64) -> usize {
    let last = edges.len() - 2;
    edges
        .partition_point(|edge| *edge < value)
        .saturating_sub(1)
        .min(last)
}

/// Round edges at the lowest precision that keeps them all distinct.
fn rounded_edges(edges: &[f64]) -> Vec<f64> {
    let distinct = |rounded: &[f64]| rounded.windows(2).all(|pair| pair[0] != pair[1]);

    for precision in LABEL_PRECISION..20 {
        let rounded: Vec<f64> = edges.iter().map(|e| round_frac(*e, precision)).collect();
        if distinct(&rounded) {
            return rounded;
        }
    }
    edges
        .iter()
        .map(|e| round_frac(*e, LABEL_PRECISION))
        .collect()
}
