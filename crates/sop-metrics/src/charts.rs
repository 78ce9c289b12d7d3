//! SVG chart rendering.
//!
//! Charts are rendered in memory with plotters' SVG backend and handed to
//! report consumers as opaque [`ChartImage`] bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use plotters::prelude::*;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::numeric_column;
use crate::error::{MetricsError, Result};
use crate::types::{ACTUAL_COLUMN, ErrorHistogram, FORECAST_COLUMN};

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 480;

const SVG_MIME: &str = "image/svg+xml";

/// A rendered chart: raw bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ChartImage {
    pub fn svg(document: String) -> Self {
        Self {
            mime: SVG_MIME.to_string(),
            bytes: document.into_bytes(),
        }
    }

    /// `data:` URI suitable for an `<img src=...>` attribute.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        if self.mime == SVG_MIME { "svg" } else { "bin" }
    }
}

/// Charts produced for one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSet {
    pub error_distribution: ChartImage,
    pub actual_vs_forecast: ChartImage,
}

/// Render both charts for an augmented dataset.
pub fn render_charts(df: &DataFrame, histogram: &ErrorHistogram) -> Result<ChartSet> {
    Ok(ChartSet {
        error_distribution: render_error_histogram(histogram)?,
        actual_vs_forecast: render_actual_vs_forecast(df)?,
    })
}

fn chart_error<E: std::fmt::Display>(err: E) -> MetricsError {
    MetricsError::ChartRenderingFailed(err.to_string())
}

/// Bar chart of the error distribution, one bar per interval.
pub fn render_error_histogram(histogram: &ErrorHistogram) -> Result<ChartImage> {
    let labels: Vec<String> = histogram.bins.iter().map(|bin| bin.label.clone()).collect();
    let bin_count = histogram.bin_count() as u32;
    let max_count = histogram.max_count() as u32;
    let y_top = max_count + max_count / 10 + 1;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Error Distribution", ("sans-serif", 24))
            .margin(12)
            .x_label_area_size(48)
            .y_label_area_size(56)
            .build_cartesian_2d((0u32..bin_count).into_segmented(), 0u32..y_top)
            .map_err(chart_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Error (Forecast - Actual)")
            .y_desc("Frequency")
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .draw()
            .map_err(chart_error)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.mix(0.7).filled())
                    .margin(4)
                    .data(
                        histogram
                            .bins
                            .iter()
                            .enumerate()
                            .map(|(i, bin)| (i as u32, bin.count as u32)),
                    ),
            )
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }

    debug!("Rendered error histogram ({} bytes)", svg.len());
    Ok(ChartImage::svg(svg))
}

/// Line chart of actual and forecast demand by row position.
pub fn render_actual_vs_forecast(df: &DataFrame) -> Result<ChartImage> {
    let actual = numeric_column(df, ACTUAL_COLUMN)?;
    let forecast = numeric_column(df, FORECAST_COLUMN)?;
    let (y_min, y_max) = value_range(actual.iter().chain(&forecast).copied());
    let x_max = actual.len().max(1);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Actual vs Forecast", ("sans-serif", 24))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(56)
            .build_cartesian_2d(0usize..x_max, y_min..y_max)
            .map_err(chart_error)?;

        chart
            .configure_mesh()
            .x_desc("Period")
            .y_desc("Demand")
            .draw()
            .map_err(chart_error)?;

        chart
            .draw_series(LineSeries::new(
                actual.iter().enumerate().map(|(i, v)| (i, *v)),
                &BLUE,
            ))
            .map_err(chart_error)?
            .label(ACTUAL_COLUMN)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart
            .draw_series(LineSeries::new(
                forecast.iter().enumerate().map(|(i, v)| (i, *v)),
                &RED,
            ))
            .map_err(chart_error)?
            .label(FORECAST_COLUMN)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }

    debug!("Rendered actual vs forecast chart ({} bytes)", svg.len());
    Ok(ChartImage::svg(svg))
}

/// Padded `(min, max)` of the values; `(0, 1)` when empty.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let padding = ((max - min) * 0.05).max(1.0);
    (min - padding, max + padding)
}
