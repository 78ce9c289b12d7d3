//! S&OP Forecast Accuracy Library
//!
//! Computes forecast-accuracy metrics for Sales & Operations Planning demand
//! data, built with Rust and Polars.
//!
//! # Overview
//!
//! Given a time series of actual and forecast demand, the library provides:
//!
//! - **Row Errors**: signed error, absolute error and percentage error per period
//! - **Summary Metrics**: MAPE, WMAPE, BIAS and Forecast Accuracy
//! - **Error Distribution**: equal-width histogram of the signed errors
//! - **Synthetic Data**: a seeded demand/forecast generator for what-if exploration
//! - **Reports**: plain text, HTML with embedded SVG charts, JSON and CSV export
//! - **Progress Reporting**: stage-by-stage updates for interactive hosts
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sop_metrics::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .record_count(300)
//!     .mean_actual(500)
//!     .noise_level(10)
//!     .build()?;
//!
//! let result = Pipeline::builder().config(config).build()?.run()?;
//!
//! for line in result.summary.display_lines() {
//!     println!("{}", line);
//! }
//! ```
//!
//! # Using the metrics directly
//!
//! The metric functions operate on any `DataFrame` with `Actual` and
//! `Forecast` columns:
//!
//! ```rust,ignore
//! use sop_metrics::metrics::{compute_error_histogram, compute_row_errors, compute_summary};
//! use polars::prelude::*;
//!
//! let df = df!["Actual" => [100i64, 200], "Forecast" => [110i64, 180]]?;
//! let augmented = compute_row_errors(&df)?;
//! let summary = compute_summary(&augmented)?;
//! let histogram = compute_error_histogram(&augmented, 5)?;
//!
//! assert_eq!(summary.bias(), -5.0);
//! assert_eq!(histogram.total_count(), 2);
//! ```
//!
//! # Errors
//!
//! Every fallible operation returns [`MetricsError`]. Malformed rows yield a
//! validation error naming the row; an empty dataset and an all-zero actual
//! series yield two distinct division errors.

pub mod charts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use charts::{ChartImage, ChartSet, render_charts};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use dataset::{CsvDatasetSource, DatasetSource, SyntheticDataGenerator};
pub use error::{MetricsError, Result as MetricsResult, ResultExt};
pub use metrics::{RowError, compute_error_histogram, compute_row_errors, compute_summary};
pub use pipeline::{
    AnalysisStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use reporting::{AnalysisReport, ReportGenerator, ReportParams, download_link};
pub use types::{
    AnalysisResult, ErrorHistogram, HistogramBin, MetricKind, MetricsSummary, TimeSeriesRow,
};
