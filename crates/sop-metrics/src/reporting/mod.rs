//! Report generation module.
//!
//! Turns computed metrics into shareable artifacts:
//!
//! - a plain-text report (fixed title, one line per metric)
//! - an HTML document embedding the error-distribution chart
//! - a JSON [`AnalysisReport`] for `--json` / `--emit-report`
//! - the augmented dataset as CSV
//! - a base64 download link for any of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use sop_metrics::reporting::ReportGenerator;
//! use std::path::PathBuf;
//!
//! let text = ReportGenerator::render_text(&result.summary);
//! let html = ReportGenerator::render_html(&result.summary, chart.as_ref());
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"), None);
//! generator.write_report_to_file(&report)?;
//! ```

mod generator;

pub use generator::{
    AnalysisReport, METRICS_HEADING, REPORT_TITLE, ReportGenerator, ReportParams, download_link,
};
