//! Main analysis pipeline.
//!
//! A [`Pipeline`] runs `config → dataset → metrics → render` once per call.
//! Nothing is cached between runs: a parameter change means building a new
//! pipeline (or calling [`Pipeline::analyze`] with a new frame) and
//! replacing the previous result as a whole.

use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::charts::{ChartSet, render_charts};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::dataset::{DatasetSource, SyntheticDataGenerator};
use crate::error::Result;
use crate::metrics::{
    compute_error_histogram, compute_row_errors, compute_summary, zero_actual_rows,
};
use crate::pipeline::progress::{
    AnalysisStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::reporting::{AnalysisReport, ReportGenerator, ReportParams};
use crate::types::{AnalysisResult, ErrorHistogram, MetricsSummary};

/// The forecast-accuracy analysis pipeline.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use sop_metrics::{CsvDatasetSource, Pipeline, PipelineConfig};
///
/// // Synthetic data driven by the configuration
/// let result = Pipeline::builder()
///     .config(PipelineConfig::builder().record_count(200).seed(7).build()?)
///     .build()?
///     .run()?;
/// println!("{}", result.summary);
///
/// // Real data from a CSV file
/// let result = Pipeline::builder()
///     .source(CsvDatasetSource::new("data/demand.csv"))
///     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
///     .build()?
///     .run()?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn DatasetSource>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    reporter: ReportGenerator,
}

// Hosts run the pipeline on a worker thread
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Description of the configured dataset source.
    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Load a fresh dataset from the source and analyze it.
    pub fn run(&self) -> Result<AnalysisResult> {
        let start_time = Instant::now();
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Initializing,
            0.0,
            "Starting analysis...",
        ));
        let outcome = self
            .load_dataset()
            .and_then(|df| self.analyze_internal(df, start_time));
        self.finish(outcome)
    }

    /// Analyze an already loaded dataset with `Date`, `Actual` and
    /// `Forecast` columns.
    pub fn analyze(&self, df: DataFrame) -> Result<AnalysisResult> {
        let start_time = Instant::now();
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Initializing,
            0.0,
            "Starting analysis...",
        ));
        let outcome = self.analyze_internal(df, start_time);
        self.finish(outcome)
    }

    fn finish(&self, outcome: Result<AnalysisResult>) -> Result<AnalysisResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Analysis completed in {}ms",
                    result.duration_ms
                )));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn load_dataset(&self) -> Result<DataFrame> {
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::LoadingData,
            0.0,
            "Loading dataset...",
        ));
        let description = self.source.describe();
        info!("Loading dataset from {}", description);

        let df = self
            .source
            .load()
            .map_err(|e| e.with_context(format!("Failed to load dataset from {}", description)))?;

        self.report_progress(ProgressUpdate::new(
            AnalysisStage::LoadingData,
            1.0,
            format!("Loaded {} rows", df.height()),
        ));
        Ok(df)
    }

    fn analyze_internal(&self, df: DataFrame, start_time: Instant) -> Result<AnalysisResult> {
        info!("Starting analysis of {} rows...", df.height());
        let mut warnings: Vec<String> = Vec::new();

        // Step 1: Row errors
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::ComputingErrors,
            0.0,
            "Computing row errors...",
        ));
        let dataset = compute_row_errors(&df)?;
        let zero_rows = zero_actual_rows(&dataset)?;
        if zero_rows > 0 {
            warnings.push(format!(
                "{} rows have zero actual demand; their percentage error was set to 0",
                zero_rows
            ));
        }

        // Step 2: Aggregate metrics
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Summarizing,
            0.0,
            "Computing accuracy metrics...",
        ));
        let summary = compute_summary(&dataset)?;
        info!(
            "MAPE={:.2}% WMAPE={:.2}% BIAS={:.2} Accuracy={:.2}%",
            summary.mape(),
            summary.wmape(),
            summary.bias(),
            summary.forecast_accuracy()
        );

        // Step 3: Error distribution
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Binning,
            0.0,
            "Binning error distribution...",
        ));
        let histogram = compute_error_histogram(&dataset, self.config.bin_count)?;
        if histogram.widened {
            warnings.push(
                "All errors are identical; the distribution range was widened by 0.1%".to_string(),
            );
        }
        debug!("Error distribution: {:?}", histogram.pairs());

        // Step 4: Charts
        let charts = if self.config.render_charts {
            self.report_progress(ProgressUpdate::new(
                AnalysisStage::RenderingCharts,
                0.0,
                "Rendering charts...",
            ));
            Some(render_charts(&dataset, &histogram)?)
        } else {
            debug!("Skipping chart rendering (disabled)");
            None
        };

        let mut result = AnalysisResult {
            dataset,
            summary,
            histogram,
            charts,
            report: None,
            warnings,
            output_files: Vec::new(),
            duration_ms: 0,
        };

        // Step 5: Reports
        if self.config.generate_reports {
            self.report_progress(ProgressUpdate::new(
                AnalysisStage::ReportGeneration,
                0.0,
                "Generating reports...",
            ));
            let report = self.build_report(
                &result.summary,
                &result.histogram,
                &result.warnings,
                result.dataset.height(),
                start_time,
            );

            if self.config.save_to_disk {
                let written = self.save_outputs(&report, &mut result)?;
                result.output_files = written;
            }
            result.report = Some(report);
        } else if self.config.save_to_disk {
            warn!("save_to_disk is set but report generation is disabled; nothing written");
        }

        result.duration_ms = start_time.elapsed().as_millis() as u64;
        if let Some(report) = result.report.as_mut() {
            report.duration_ms = result.duration_ms;
        }
        Ok(result)
    }

    fn build_report(
        &self,
        summary: &MetricsSummary,
        histogram: &ErrorHistogram,
        warnings: &[String],
        row_count: usize,
        start_time: Instant,
    ) -> AnalysisReport {
        let source = self.source.describe();
        ReportGenerator::build_report(ReportParams {
            source: &source,
            row_count,
            summary,
            histogram,
            warnings,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    fn save_outputs(
        &self,
        report: &AnalysisReport,
        result: &mut AnalysisResult,
    ) -> Result<Vec<PathBuf>> {
        let mut written = vec![
            self.reporter.write_report_to_file(report)?,
            self.reporter.write_text_report(&result.summary)?,
        ];

        let error_chart = result.charts.as_ref().map(|c| &c.error_distribution);
        written.push(self.reporter.write_html_report(&result.summary, error_chart)?);

        if let Some(ChartSet {
            error_distribution,
            actual_vs_forecast,
        }) = &result.charts
        {
            written.push(self.reporter.write_chart("error_distribution", error_distribution)?);
            written.push(self.reporter.write_chart("actual_vs_forecast", actual_vs_forecast)?);
        }

        written.push(self.reporter.write_dataset_csv(&mut result.dataset)?);

        info!(
            "Saved {} files to {}",
            written.len(),
            self.reporter.output_dir().display()
        );
        Ok(written)
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Without an explicit [`source`](Self::source) the pipeline generates
/// synthetic data from the configuration.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    source: Option<Arc<dyn DatasetSource>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read data from `source` instead of the synthetic generator.
    pub fn source<S>(mut self, source: S) -> Self
    where
        S: DatasetSource + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Share a dataset source between pipelines.
    pub fn shared_source(mut self, source: Arc<dyn DatasetSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(SyntheticDataGenerator::from_config(&config)));
        let reporter = ReportGenerator::from_config(&config);

        Ok(Pipeline {
            config,
            source,
            progress_reporter: self.progress_reporter,
            reporter,
        })
    }
}
