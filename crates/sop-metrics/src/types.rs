use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::charts::ChartSet;
use crate::reporting::AnalysisReport;

// ============================================================================
// Column names
// ============================================================================

pub const DATE_COLUMN: &str = "Date";
pub const ACTUAL_COLUMN: &str = "Actual";
pub const FORECAST_COLUMN: &str = "Forecast";
pub const ERROR_COLUMN: &str = "Error";
pub const ABSOLUTE_ERROR_COLUMN: &str = "Absolute_Error";
pub const PERCENTAGE_ERROR_COLUMN: &str = "Percentage_Error";

/// One observation of the demand series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    /// Observed quantity (non-negative).
    pub actual: i64,
    /// Predicted quantity; may be negative after noise injection.
    pub forecast: i64,
}

impl TimeSeriesRow {
    pub fn new(date: NaiveDate, actual: i64, forecast: i64) -> Self {
        Self {
            date,
            actual,
            forecast,
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// The four accuracy metrics, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Mape,
    Wmape,
    Bias,
    ForecastAccuracy,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Mape,
        MetricKind::Wmape,
        MetricKind::Bias,
        MetricKind::ForecastAccuracy,
    ];

    /// Key used in reports and serialized summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mape => "MAPE",
            Self::Wmape => "WMAPE",
            Self::Bias => "BIAS",
            Self::ForecastAccuracy => "Forecast_Accuracy",
        }
    }

    /// Long, human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Mape => "MAPE - Mean Absolute Percentage Error",
            Self::Wmape => "WMAPE - Weighted Mean Absolute Percentage Error",
            Self::Bias => "BIAS - Forecast Bias",
            Self::ForecastAccuracy => "Forecast Accuracy",
        }
    }

    pub fn formula(&self) -> &'static str {
        match self {
            Self::Mape => "MAPE = (1/n) * Σ(|Forecast - Actual| / Actual) * 100%",
            Self::Wmape => "WMAPE = (Σ|Forecast - Actual| / ΣActual) * 100%",
            Self::Bias => "BIAS = (1/n) * Σ(Forecast - Actual)",
            Self::ForecastAccuracy => "Forecast Accuracy = 100% - MAPE",
        }
    }

    /// Interpretation notes shown next to the formula.
    pub fn notes(&self) -> &'static [&'static str] {
        match self {
            Self::Mape => &[
                "Average absolute error as a percentage of actual demand",
                "Comparable across products with different volumes",
                "Rows with zero actual demand contribute 0% instead of an unbounded value",
            ],
            Self::Wmape => &[
                "Volume-weighted version of MAPE",
                "High-demand periods weigh more than low-demand periods",
                "Suited to portfolios whose demand varies widely",
            ],
            Self::Bias => &[
                "Average signed error, in units of demand",
                "Positive: forecasts are consistently above actual demand",
                "Negative: forecasts are consistently below actual demand",
            ],
            Self::ForecastAccuracy => &[
                "Overall share of demand predicted correctly",
                "Values above 85% are usually considered excellent",
                "Read together with BIAS and WMAPE",
            ],
        }
    }

    /// BIAS is in demand units; the others are percentages.
    pub fn is_percentage(&self) -> bool {
        !matches!(self, Self::Bias)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate accuracy metrics of one dataset snapshot.
///
/// Percentages are already multiplied by 100 (`12.34` means 12.34%).
/// `Forecast_Accuracy` is derived from MAPE on access and never stored;
/// it is written when serializing and ignored when reading back.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "StoredMetrics")]
pub struct MetricsSummary {
    mape: f64,
    wmape: f64,
    bias: f64,
}

impl MetricsSummary {
    pub(crate) fn new(mape: f64, wmape: f64, bias: f64) -> Self {
        Self { mape, wmape, bias }
    }

    pub fn mape(&self) -> f64 {
        self.mape
    }

    pub fn wmape(&self) -> f64 {
        self.wmape
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn forecast_accuracy(&self) -> f64 {
        100.0 - self.mape
    }

    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Mape => self.mape(),
            MetricKind::Wmape => self.wmape(),
            MetricKind::Bias => self.bias(),
            MetricKind::ForecastAccuracy => self.forecast_accuracy(),
        }
    }

    /// Metric values as plain `(name, value)` pairs in report order.
    pub fn pairs(&self) -> [(&'static str, f64); 4] {
        MetricKind::ALL.map(|kind| (kind.name(), self.get(kind)))
    }

    /// Dashboard lines: percentages carry `%`, BIAS is shown in demand units.
    pub fn display_lines(&self) -> Vec<String> {
        MetricKind::ALL
            .iter()
            .map(|kind| {
                let value = self.get(*kind);
                if kind.is_percentage() {
                    format!("{}: {:.2}%", kind.name(), value)
                } else {
                    format!("{}: {:.2}", kind.name(), value)
                }
            })
            .collect()
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        for line in self.display_lines() {
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct StoredMetrics {
    #[serde(rename = "MAPE")]
    mape: f64,
    #[serde(rename = "WMAPE")]
    wmape: f64,
    #[serde(rename = "BIAS")]
    bias: f64,
}

impl From<StoredMetrics> for MetricsSummary {
    fn from(stored: StoredMetrics) -> Self {
        Self::new(stored.mape, stored.wmape, stored.bias)
    }
}

impl Serialize for MetricsSummary {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("MetricsSummary", 4)?;
        for (name, value) in self.pairs() {
            state.serialize_field(name, &value)?;
        }
        state.end()
    }
}

// ============================================================================
// Error distribution
// ============================================================================

/// One right-closed interval `(lower, upper]` of the error distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    /// Rounded interval text, e.g. `"(-120.5, -60.2]"`.
    pub label: String,
    pub count: usize,
}

/// Equal-width binning of the `Error` column, ordered by lower bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHistogram {
    pub bins: Vec<HistogramBin>,
    /// True when every error was identical and the range had to be widened.
    pub widened: bool,
}

impl ErrorHistogram {
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Total number of rows counted; equals the dataset height.
    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).max().unwrap_or(0)
    }

    /// `(interval_label, count)` pairs in ascending interval order.
    pub fn pairs(&self) -> Vec<(String, usize)> {
        self.bins
            .iter()
            .map(|bin| (bin.label.clone(), bin.count))
            .collect()
    }
}

// ============================================================================
// Pipeline output
// ============================================================================

/// Everything one pipeline run produces from a dataset snapshot.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Source rows augmented with `Error`, `Absolute_Error` and `Percentage_Error`.
    pub dataset: DataFrame,
    pub summary: MetricsSummary,
    pub histogram: ErrorHistogram,
    /// Rendered charts, when chart rendering is enabled.
    pub charts: Option<ChartSet>,
    /// Report data, when report generation is enabled.
    pub report: Option<AnalysisReport>,
    pub warnings: Vec<String>,
    /// Files written when saving to disk is enabled.
    pub output_files: Vec<PathBuf>,
    pub duration_ms: u64,
}
