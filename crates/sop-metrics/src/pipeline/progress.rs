//! Progress reporting for the metrics pipeline.
//!
//! A host (CLI, desktop shell, web handler) can observe a run by passing a
//! [`ProgressReporter`] or a closure to the pipeline builder.
//!
//! # Example
//!
//! ```rust,ignore
//! use sop_metrics::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .run();
//! ```

use serde::{Deserialize, Serialize};

/// Stages of one analysis run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Validating configuration and preparing the run
    Initializing,
    /// Generating or reading the dataset
    LoadingData,
    /// Computing per-row errors
    ComputingErrors,
    /// Computing MAPE, WMAPE and BIAS
    Summarizing,
    /// Binning the error distribution
    Binning,
    /// Rendering SVG charts
    RenderingCharts,
    /// Building and writing reports
    ReportGeneration,
    /// Run completed successfully
    Complete,
    /// Run failed with an error
    Failed,
}

impl AnalysisStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::LoadingData => "Loading Data",
            Self::ComputingErrors => "Computing Errors",
            Self::Summarizing => "Summarizing Metrics",
            Self::Binning => "Binning Errors",
            Self::RenderingCharts => "Rendering Charts",
            Self::ReportGeneration => "Generating Reports",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::LoadingData => 0.18,
            Self::ComputingErrors => 0.20,
            Self::Summarizing => 0.10,
            Self::Binning => 0.10,
            Self::RenderingCharts => 0.25,
            Self::ReportGeneration => 0.15,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::LoadingData => 0.02,
            Self::ComputingErrors => 0.20,
            Self::Summarizing => 0.40,
            Self::Binning => 0.50,
            Self::RenderingCharts => 0.60,
            Self::ReportGeneration => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: AnalysisStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: AnalysisStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: AnalysisStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

/// Receiver of progress updates.
///
/// Implementations must be `Send + Sync` because the pipeline may run on a
/// worker thread while the host listens elsewhere.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}
