use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use maud::{DOCTYPE, html};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::charts::ChartImage;
use crate::config::{DEFAULT_OUTPUT_NAME, PipelineConfig};
use crate::dataset::save_csv;
use crate::error::{MetricsError, Result};
use crate::types::{ErrorHistogram, HistogramBin, MetricKind, MetricsSummary};

/// Title printed at the top of every report.
pub const REPORT_TITLE: &str = "Forecast Report - S&OP Metrics";

/// Heading above the metric lines.
pub const METRICS_HEADING: &str = "Calculated Metrics:";

// ============================================================================
// Report Types
// ============================================================================

/// Machine-readable report of one analysis.
///
/// Used for JSON output to stdout (`--json`) and for the report file
/// written with `--emit-report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub title: String,
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Where the dataset came from (generator parameters or file path)
    pub source: String,
    pub row_count: usize,
    pub metrics: MetricsSummary,
    /// Error distribution, ascending by interval
    pub error_distribution: Vec<HistogramBin>,
    /// True when all errors were identical and the bin range was widened
    pub histogram_widened: bool,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

/// Inputs for [`ReportGenerator::build_report`].
pub struct ReportParams<'a> {
    pub source: &'a str,
    pub row_count: usize,
    pub summary: &'a MetricsSummary,
    pub histogram: &'a ErrorHistogram,
    pub warnings: &'a [String],
    pub duration_ms: u64,
}

// ============================================================================
// Generator
// ============================================================================

/// Renders reports and writes them to the output directory.
///
/// Every file name starts with the configured base name, e.g.
/// `sop_report.txt`, `sop_report.html`, `sop_report_report.json`.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            output_name: None,
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator with custom output settings.
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_name.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn base_name(&self) -> &str {
        self.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME)
    }

    /// Assemble the JSON report structure.
    pub fn build_report(params: ReportParams<'_>) -> AnalysisReport {
        let ReportParams {
            source,
            row_count,
            summary,
            histogram,
            warnings,
            duration_ms,
        } = params;

        AnalysisReport {
            title: REPORT_TITLE.to_string(),
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source: source.to_string(),
            row_count,
            metrics: *summary,
            error_distribution: histogram.bins.clone(),
            histogram_widened: histogram.widened,
            warnings: warnings.to_vec(),
            duration_ms,
        }
    }

    /// Metric lines as they appear in documents.
    ///
    /// Every line carries a `%` suffix, BIAS included, to stay compatible
    /// with previously exported reports. Use
    /// [`MetricsSummary::display_lines`] for on-screen output.
    pub fn metric_lines(summary: &MetricsSummary) -> Vec<String> {
        summary
            .pairs()
            .iter()
            .map(|(name, value)| format!("{}: {:.2}%", name, value))
            .collect()
    }

    /// Plain-text report: title, heading, one line per metric.
    pub fn render_text(summary: &MetricsSummary) -> String {
        let mut text = String::new();
        text.push_str(REPORT_TITLE);
        text.push_str("\n\n");
        text.push_str(METRICS_HEADING);
        text.push('\n');
        for line in Self::metric_lines(summary) {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }

    /// Standalone HTML document with the metric lines and, if given, the
    /// chart embedded as a `data:` URI.
    pub fn render_html(summary: &MetricsSummary, chart: Option<&ChartImage>) -> String {
        let lines = Self::metric_lines(summary);
        let markup = html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (REPORT_TITLE) }
                    style {
                        "body { font-family: Arial, sans-serif; margin: 2em; } "
                        "li { font-size: 14px; margin: 4px 0; } "
                        "img { max-width: 100%; }"
                    }
                }
                body {
                    h1 { (REPORT_TITLE) }
                    h2 { (METRICS_HEADING) }
                    ul class="metrics" {
                        @for line in &lines {
                            li { (line) }
                        }
                    }
                    @if let Some(chart) = chart {
                        img src=(chart.to_data_uri()) alt="Error distribution";
                    }
                }
            }
        };
        markup.into_string()
    }

    /// Plain-text explanation of every metric: formula and notes.
    pub fn render_explanations() -> String {
        let mut text = String::new();
        for kind in MetricKind::ALL {
            text.push_str(kind.title());
            text.push('\n');
            text.push_str("  ");
            text.push_str(kind.formula());
            text.push('\n');
            for note in kind.notes() {
                text.push_str("  - ");
                text.push_str(note);
                text.push('\n');
            }
            text.push('\n');
        }
        text
    }

    /// Write the JSON report as `<name>_report.json`.
    pub fn write_report_to_file(&self, report: &AnalysisReport) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(report)?;
        self.write_file(&format!("{}_report.json", self.base_name()), content.as_bytes())
    }

    /// Write the plain-text report as `<name>.txt`.
    pub fn write_text_report(&self, summary: &MetricsSummary) -> Result<PathBuf> {
        let content = Self::render_text(summary);
        self.write_file(&format!("{}.txt", self.base_name()), content.as_bytes())
    }

    /// Write the HTML report as `<name>.html`.
    pub fn write_html_report(
        &self,
        summary: &MetricsSummary,
        chart: Option<&ChartImage>,
    ) -> Result<PathBuf> {
        let content = Self::render_html(summary, chart);
        self.write_file(&format!("{}.html", self.base_name()), content.as_bytes())
    }

    /// Write a chart as `<name>_<chart_name>.<ext>`.
    pub fn write_chart(&self, chart_name: &str, chart: &ChartImage) -> Result<PathBuf> {
        let file_name = format!("{}_{}.{}", self.base_name(), chart_name, chart.extension());
        self.write_file(&file_name, &chart.bytes)
    }

    /// Write the augmented dataset as `<name>_data.csv`.
    pub fn write_dataset_csv(&self, df: &mut DataFrame) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}_data.csv", self.base_name()));
        save_csv(df, &path).map_err(|e| e.with_context("Failed to export dataset"))?;
        Ok(path)
    }

    fn write_file(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join(file_name);
        let mut file = File::create(&path).map_err(|e| {
            MetricsError::ReportGenerationFailed(format!("{}: {}", path.display(), e))
        })?;
        file.write_all(bytes)?;

        info!("Report saved: {}", path.display());
        Ok(path)
    }
}

/// HTML anchor that downloads `bytes` as `file_name` through a base64
/// `data:` URI.
pub fn download_link(bytes: &[u8], file_name: &str) -> String {
    let href = format!(
        "data:application/octet-stream;base64,{}",
        STANDARD.encode(bytes)
    );
    html! {
        a href=(href) download=(file_name) { "Download " (file_name) }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::bin_values;
    use pretty_assertions::assert_eq;

    fn sample_summary() -> MetricsSummary {
        MetricsSummary::new(10.0, 10.0, -5.0)
    }

    #[test]
    fn test_render_text() {
        let text = ReportGenerator::render_text(&sample_summary());
        assert_eq!(
            text,
            "Forecast Report - S&OP Metrics\n\
             \n\
             Calculated Metrics:\n\
             MAPE: 10.00%\n\
             WMAPE: 10.00%\n\
             BIAS: -5.00%\n\
             Forecast_Accuracy: 90.00%\n"
        );
    }

    #[test]
    fn test_render_html_embeds_chart() {
        let chart = ChartImage::svg("<svg/>".to_string());
        let html = ReportGenerator::render_html(&sample_summary(), Some(&chart));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Forecast Report - S&amp;OP Metrics"));
        assert!(html.contains("<li>BIAS: -5.00%</li>"));
        assert!(html.contains("src=\"data:image/svg+xml;base64,PHN2Zy8+\""));
    }

    #[test]
    fn test_render_html_without_chart() {
        let html = ReportGenerator::render_html(&sample_summary(), None);
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_explanations_cover_every_metric() {
        let text = ReportGenerator::render_explanations();
        assert!(text.contains("MAPE - Mean Absolute Percentage Error"));
        assert!(text.contains("WMAPE = (Σ|Forecast - Actual| / ΣActual) * 100%"));
        assert!(text.contains("BIAS - Forecast Bias"));
        assert!(text.contains("Forecast Accuracy = 100% - MAPE"));
    }

    #[test]
    fn test_download_link() {
        let link = download_link(b"abc", "report.txt");
        assert_eq!(
            link,
            "<a href=\"data:application/octet-stream;base64,YWJj\" download=\"report.txt\">Download report.txt</a>"
        );
    }

    #[test]
    fn test_build_and_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().to_path_buf(), Some("weekly".into()));
        let histogram = bin_values(&[10.0, -20.0], 5).unwrap();
        let warnings = vec!["note".to_string()];

        let report = ReportGenerator::build_report(ReportParams {
            source: "unit test",
            row_count: 2,
            summary: &sample_summary(),
            histogram: &histogram,
            warnings: &warnings,
            duration_ms: 3,
        });
        assert_eq!(report.title, REPORT_TITLE);
        assert_eq!(report.error_distribution.len(), 5);

        let path = generator.write_report_to_file(&report).unwrap();
        assert_eq!(path.file_name().unwrap(), "weekly_report.json");

        let content = std::fs::read_to_string(&path).unwrap();
        let back: AnalysisReport = serde_json::from_str(&content).unwrap();
        assert_eq!(back.metrics, report.metrics);
        assert_eq!(back.row_count, 2);
        assert_eq!(back.warnings, warnings);
        assert_eq!(back.error_distribution[0].label, "(-20.03, -14.0]");
        assert!(content.contains("\"Forecast_Accuracy\": 90.0"));
    }

    #[test]
    fn test_write_text_and_html() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().join("out"), None);

        let text_path = generator.write_text_report(&sample_summary()).unwrap();
        let html_path = generator.write_html_report(&sample_summary(), None).unwrap();

        assert_eq!(text_path.file_name().unwrap(), "sop_report.txt");
        assert_eq!(html_path.file_name().unwrap(), "sop_report.html");
        assert!(std::fs::read_to_string(text_path).unwrap().contains("WMAPE: 10.00%"));
    }
}
