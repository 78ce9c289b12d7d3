//! Custom error types for the forecast-accuracy metrics engine.
//!
//! This module provides the error taxonomy used throughout the crate:
//!
//! - **Validation errors** ([`MetricsError::Validation`], [`MetricsError::ColumnNotFound`]):
//!   a row carries a missing or malformed numeric field. The whole dataset is
//!   rejected; no partial metrics are produced.
//! - **Division errors** ([`MetricsError::NoData`], [`MetricsError::ZeroActualSum`]):
//!   an aggregate is undefined. The two cases are kept apart so callers can
//!   tell "no data" from "all-zero actual values".
//!
//! Errors are serializable so a display layer can receive them as
//! `{ "code": ..., "message": ... }` objects.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the metrics engine and its pipeline.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// A row holds a missing, non-numeric or out-of-domain value.
    #[error("Validation failed at row {row}, column '{column}': {reason}")]
    Validation {
        row: usize,
        column: String,
        reason: String,
    },

    /// A required column is absent from the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The dataset has no rows, so every mean is undefined.
    #[error("No data: cannot compute metrics over an empty dataset")]
    NoData,

    /// Every actual value is zero, so WMAPE is undefined.
    #[error("Sum of actual values is zero across {rows} rows: WMAPE is undefined")]
    ZeroActualSum { rows: usize },

    /// Histogram requested with fewer than one bin.
    #[error("Invalid bin count: {0} (must be at least 1)")]
    InvalidBinCount(usize),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Chart rendering failed.
    #[error("Failed to render chart: {0}")]
    ChartRenderingFailed(String),

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MetricsError>,
    },
}

impl MetricsError {
    /// Build a validation error for `column` at `row`.
    pub fn validation(row: usize, column: impl Into<String>, reason: impl Into<String>) -> Self {
        MetricsError::Validation {
            row,
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MetricsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NoData => "NO_DATA",
            Self::ZeroActualSum { .. } => "ZERO_ACTUAL_SUM",
            Self::InvalidBinCount(_) => "INVALID_BIN_COUNT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ChartRenderingFailed(_) => "CHART_RENDERING_FAILED",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means a row failed validation.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Self::Validation { .. } | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error means an aggregate was undefined (empty data or zero actual sum).
    pub fn is_division_error(&self) -> bool {
        match self {
            Self::NoData | Self::ZeroActualSum { .. } => true,
            Self::WithContext { source, .. } => source.is_division_error(),
            _ => false,
        }
    }

    /// Row index carried by a validation error, if any.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            Self::Validation { row, .. } => Some(*row),
            Self::WithContext { source, .. } => source.row_index(),
            _ => None,
        }
    }
}

impl From<ConfigValidationError> for MetricsError {
    fn from(err: ConfigValidationError) -> Self {
        MetricsError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields,
/// making them easy to handle in a front end.
impl Serialize for MetricsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("MetricsError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MetricsError::Polars(e).with_context(context))
    }
}
