//! Shared utilities for the metrics engine.
//!
//! Helpers used by more than one module: dtype checks, strict parsing of
//! numeric text, order-independent summation and float formatting for
//! interval labels.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds text that may still contain numbers.
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Plain decimals (`42`, `-7.5`) and numbers with well-formed thousands
/// groups (`1,234`, `12,345.6`). Anything else is not a demand value.
static NUMERIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+|\d{1,3}(,\d{3})+)(\.\d+)?$").expect("Invalid regex: numeric value")
});

/// Text markers that stand for a missing value.
pub const MISSING_MARKERS: [&str; 8] = [
    "error", "unknown", "n/a", "na", "null", "missing", "none", "#n/a",
];

/// Check if a string is empty or a missing-value marker such as `"N/A"`.
pub fn is_missing_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.is_empty() || MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Parse a numeric cell.
///
/// Surrounding whitespace is ignored and commas are accepted only as
/// thousands separators. Decimal commas (`"1,5"`), units (`"12%"`, `"$5"`)
/// and embedded spaces (`"1 0"`) return `None`.
///
/// ```rust,ignore
/// use sop_metrics::utils::parse_numeric_string;
///
/// assert_eq!(parse_numeric_string("1,234"), Some(1234.0));
/// assert_eq!(parse_numeric_string("1,5"), None);
/// ```
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if !NUMERIC_PATTERN.is_match(trimmed) {
        return None;
    }
    trimmed.replace(',', "").parse::<f64>().ok()
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Sum values in ascending order.
///
/// Floating-point addition is not associative; summing a sorted copy makes
/// the result identical for every permutation of `values`.
pub fn sorted_sum(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.iter().sum()
}

/// Arithmetic mean computed with [`sorted_sum`]. `None` for an empty slice.
pub fn sorted_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(sorted_sum(values) / values.len() as f64)
    }
}

/// Round `x` to `precision` significant decimals.
///
/// Numbers with an integer part keep `precision` digits after the point.
/// Pure fractions keep `precision` digits after their leading zeros, so
/// `0.000123456` rounds to `0.000123` at precision 3. Ties go to even.
pub fn round_frac(x: f64, precision: u32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }

    let whole = x.trunc();
    let digits = if whole == 0.0 {
        let frac = x.fract().abs();
        -(frac.log10().floor() as i32) - 1 + precision as i32
    } else {
        precision as i32
    };

    let scale = 10f64.powi(digits);
    if !scale.is_finite() || scale == 0.0 {
        return x;
    }
    let rounded = (x * scale).round_ties_even() / scale;
    if rounded.is_finite() { rounded } else { x }
}

/// Format a float so integral values keep a trailing `.0` (`7.0`, `-12.5`).
pub fn format_bound(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
        assert!(is_text_dtype(&DataType::String));
    }

    #[test]
    fn test_is_missing_marker() {
        assert!(is_missing_marker(""));
        assert!(is_missing_marker("  "));
        assert!(is_missing_marker("N/A"));
        assert!(is_missing_marker("null"));
        assert!(!is_missing_marker("0"));
        assert!(!is_missing_marker("abc"));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string("1,234"), Some(1234.0));
        assert_eq!(parse_numeric_string("-100"), Some(-100.0));
        assert_eq!(parse_numeric_string(" 12,345.5 "), Some(12345.5));
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("abc"), None);
    }

    #[test]
    fn test_parse_numeric_string_rejects_malformed() {
        // decimal comma, unit suffix, embedded space
        assert_eq!(parse_numeric_string("1,5"), None);
        assert_eq!(parse_numeric_string("12%"), None);
        assert_eq!(parse_numeric_string("1 0"), None);
        // misplaced groups and currency
        assert_eq!(parse_numeric_string("12,34,567"), None);
        assert_eq!(parse_numeric_string("1234,567"), None);
        assert_eq!(parse_numeric_string("$5"), None);
        assert_eq!(parse_numeric_string("1e3"), None);
    }

    #[test]
    fn test_sorted_sum_is_permutation_invariant() {
        let a = [0.1, 1e16, -1e16, 0.2, 0.3];
        let b = [0.3, -1e16, 0.2, 1e16, 0.1];
        assert_eq!(sorted_sum(&a).to_bits(), sorted_sum(&b).to_bits());
        assert_eq!(sorted_sum(&[]), 0.0);
    }

    #[test]
    fn test_sorted_mean() {
        assert_eq!(sorted_mean(&[10.0, -20.0]), Some(-5.0));
        assert_eq!(sorted_mean(&[]), None);
    }

    #[test]
    fn test_round_frac() {
        assert_eq!(round_frac(6.9958, 3), 6.996);
        assert_eq!(round_frac(-120.4567, 3), -120.457);
        assert_eq!(round_frac(0.000123456, 3), 0.000123);
        assert_eq!(round_frac(0.0, 3), 0.0);
        assert_eq!(round_frac(7.0, 3), 7.0);
    }

    #[test]
    fn test_format_bound() {
        assert_eq!(format_bound(7.0), "7.0");
        assert_eq!(format_bound(-20.0), "-20.0");
        assert_eq!(format_bound(6.993), "6.993");
        assert_eq!(format_bound(-0.001), "-0.001");
    }
}
