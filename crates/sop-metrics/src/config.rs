//! Configuration types for the metrics pipeline.
//!
//! A [`PipelineConfig`] carries every parameter of one recomputation:
//! the synthetic generator inputs (`record_count`, `mean_actual`,
//! `noise_level`, `seed`), the histogram bin count and the output settings.
//! A parameter change is modelled as a new configuration and a fresh run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Typical range of the record-count control on the dashboard.
pub const RECORD_COUNT_RANGE: RangeInclusive<usize> = 100..=500;

/// Typical range of the mean-demand control on the dashboard.
pub const MEAN_ACTUAL_RANGE: RangeInclusive<u32> = 300..=700;

/// Typical range of the noise-level control on the dashboard (percent).
pub const NOISE_LEVEL_RANGE: RangeInclusive<u32> = 0..=30;

/// Upper bound accepted for `noise_level` (percent).
pub const MAX_NOISE_LEVEL: u32 = 100;

/// Number of error-distribution bins used when none is given.
pub const DEFAULT_BIN_COUNT: usize = 5;

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// Base name of report files when no output name is configured.
pub const DEFAULT_OUTPUT_NAME: &str = "sop_report";

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

/// Configuration for the metrics pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use sop_metrics::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .record_count(250)
///     .mean_actual(600)
///     .noise_level(15)
///     .seed(7)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of rows the synthetic generator produces.
    /// Default: 100
    pub record_count: usize,

    /// Mean of the generated actual demand.
    /// Default: 500
    pub mean_actual: u32,

    /// Spread of the forecast noise, in percent.
    /// Default: 10
    pub noise_level: u32,

    /// Seed of the synthetic generator.
    /// Default: 42
    pub seed: u64,

    /// Date of the first generated row; later rows are one day apart.
    /// Default: 2023-01-01
    pub start_date: NaiveDate,

    /// Number of equal-width bins of the error distribution.
    /// Default: 5
    pub bin_count: usize,

    /// Whether to render SVG charts.
    /// Default: true
    pub render_charts: bool,

    /// Whether to build the report artifacts.
    /// Default: true
    pub generate_reports: bool,

    /// Whether to write reports and the augmented dataset to disk.
    /// When false, results are kept in memory only.
    /// Default: false
    pub save_to_disk: bool,

    /// Output directory for reports and exported data.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Custom base name for output files (without extension).
    /// If None, uses "sop_report".
    /// Default: None
    pub output_name: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            record_count: 100,
            mean_actual: 500,
            noise_level: 10,
            seed: DEFAULT_SEED,
            start_date: default_start_date(),
            bin_count: DEFAULT_BIN_COUNT,
            render_charts: true,
            generate_reports: true,
            save_to_disk: false,
            output_dir: PathBuf::from("output"),
            output_name: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.noise_level > MAX_NOISE_LEVEL {
            return Err(ConfigValidationError::InvalidNoiseLevel(self.noise_level));
        }

        if self.bin_count == 0 {
            return Err(ConfigValidationError::InvalidBinCount(self.bin_count));
        }

        if let Some(name) = &self.output_name {
            if name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyOutputName);
            }
        }

        Ok(())
    }

    /// Base name used for report and dataset files.
    pub fn output_base_name(&self) -> &str {
        self.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME)
    }

    /// Whether the generator inputs sit inside the dashboard's usual ranges.
    pub fn within_dashboard_ranges(&self) -> bool {
        RECORD_COUNT_RANGE.contains(&self.record_count)
            && MEAN_ACTUAL_RANGE.contains(&self.mean_actual)
            && NOISE_LEVEL_RANGE.contains(&self.noise_level)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid noise level: {0}% (must be between 0 and 100)")]
    InvalidNoiseLevel(u32),

    #[error("Invalid bin count: {0} (must be at least 1)")]
    InvalidBinCount(usize),

    #[error("Output name must not be empty")]
    EmptyOutputName,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    record_count: Option<usize>,
    mean_actual: Option<u32>,
    noise_level: Option<u32>,
    seed: Option<u64>,
    start_date: Option<NaiveDate>,
    bin_count: Option<usize>,
    render_charts: Option<bool>,
    generate_reports: Option<bool>,
    save_to_disk: Option<bool>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
}

impl PipelineConfigBuilder {
    /// Set the number of generated rows.
    ///
    /// Zero is accepted; the engine then reports a "no data" error.
    pub fn record_count(mut self, count: usize) -> Self {
        self.record_count = Some(count);
        self
    }

    /// Set the mean of the generated actual demand.
    pub fn mean_actual(mut self, mean: u32) -> Self {
        self.mean_actual = Some(mean);
        self
    }

    /// Set the forecast noise level in percent (0 - 100).
    pub fn noise_level(mut self, percent: u32) -> Self {
        self.noise_level = Some(percent);
        self
    }

    /// Set the generator seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the date of the first generated row.
    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Set the number of error-distribution bins.
    pub fn bin_count(mut self, bins: usize) -> Self {
        self.bin_count = Some(bins);
        self
    }

    /// Enable or disable chart rendering.
    pub fn render_charts(mut self, render: bool) -> Self {
        self.render_charts = Some(render);
        self
    }

    /// Enable or disable report generation.
    pub fn generate_reports(mut self, generate: bool) -> Self {
        self.generate_reports = Some(generate);
        self
    }

    /// Enable or disable writing outputs to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Set the output directory for reports and exported data.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output base name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            record_count: self.record_count.unwrap_or(defaults.record_count),
            mean_actual: self.mean_actual.unwrap_or(defaults.mean_actual),
            noise_level: self.noise_level.unwrap_or(defaults.noise_level),
            seed: self.seed.unwrap_or(defaults.seed),
            start_date: self.start_date.unwrap_or(defaults.start_date),
            bin_count: self.bin_count.unwrap_or(defaults.bin_count),
            render_charts: self.render_charts.unwrap_or(defaults.render_charts),
            generate_reports: self.generate_reports.unwrap_or(defaults.generate_reports),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            output_name: self.output_name,
        };

        config.validate()?;
        Ok(config)
    }
}
