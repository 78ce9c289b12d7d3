//! Integration tests for the forecast-accuracy pipeline.
//!
//! These tests verify end-to-end behavior using CSV fixtures, the synthetic
//! generator and property-based checks of the metric invariants.

use polars::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sop_metrics::dataset::{numeric_column, rows_to_dataframe};
use sop_metrics::{
    AnalysisStage, CsvDatasetSource, MetricsError, Pipeline, PipelineConfig, SyntheticDataGenerator,
    compute_error_histogram, compute_row_errors, compute_summary,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_source(filename: &str) -> CsvDatasetSource {
    CsvDatasetSource::new(fixtures_path().join(filename))
}

fn in_memory_config() -> PipelineConfig {
    PipelineConfig::builder()
        .render_charts(false)
        .build()
        .unwrap()
}

fn run_fixture(filename: &str) -> sop_metrics::MetricsResult<sop_metrics::AnalysisResult> {
    Pipeline::builder()
        .config(in_memory_config())
        .source(fixture_source(filename))
        .build()
        .unwrap()
        .run()
}

fn frame(actual: &[i64], forecast: &[i64]) -> DataFrame {
    df!["Actual" => actual.to_vec(), "Forecast" => forecast.to_vec()].unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

// ============================================================================
// CSV Fixture Tests
// ============================================================================

#[test]
fn test_csv_sample_end_to_end() {
    let result = run_fixture("forecast_sample.csv").unwrap();

    // Lowercase headers are normalized
    assert!(result.dataset.column("Actual").is_ok());
    assert_eq!(result.dataset.height(), 6);

    assert_close(result.summary.mape(), 70.0 / 6.0);
    assert_close(result.summary.wmape(), 90.0 / 650.0 * 100.0);
    assert_close(result.summary.bias(), -10.0 / 6.0);
    assert_close(result.summary.forecast_accuracy(), 100.0 - 70.0 / 6.0);

    let counts: Vec<usize> = result.histogram.bins.iter().map(|b| b.count).collect();
    assert_eq!(counts, vec![2, 0, 1, 2, 1]);
    assert_eq!(result.histogram.bins[0].label, "(-30.05, -20.0]");
    assert!(!result.histogram.widened);

    // The zero-actual row is counted but not an error
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("1 rows have zero actual demand"));
}

#[test]
fn test_csv_zero_actual_row_has_zero_percentage_error() {
    let result = run_fixture("forecast_sample.csv").unwrap();
    let percentage = numeric_column(&result.dataset, "Percentage_Error").unwrap();
    assert_eq!(percentage[5], 0.0);
    assert_close(percentage[3], 0.25);
}

#[test]
fn test_csv_thousands_separators() {
    let result = run_fixture("thousands.csv").unwrap();
    let errors = numeric_column(&result.dataset, "Error").unwrap();
    assert_eq!(errors, vec![100.0, -50.0]);
    assert_close(result.summary.bias(), 25.0);
}

#[test]
fn test_csv_missing_value_names_row() {
    let err = run_fixture("with_missing.csv").unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!(err.row_index(), Some(1));
    assert!(err.to_string().contains("missing value"));
}

#[test]
fn test_csv_non_numeric_value_names_row() {
    let err = run_fixture("non_numeric.csv").unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!(err.row_index(), Some(2));
    assert!(err.to_string().contains("Forecast"));
    assert!(err.to_string().contains("\"abc\""));
}

#[test]
fn test_csv_all_zero_actuals() {
    let err = run_fixture("zero_actual.csv").unwrap_err();
    assert!(matches!(err, MetricsError::ZeroActualSum { rows: 2 }));
    assert_eq!(err.error_code(), "ZERO_ACTUAL_SUM");
}

#[test]
fn test_missing_file_is_io_error() {
    let err = run_fixture("does_not_exist.csv").unwrap_err();
    assert!(!err.is_validation_error());
    assert!(err.to_string().contains("Failed to load dataset"));
}

#[test]
fn test_error_serializes_for_display_layer() {
    let err = run_fixture("non_numeric.csv").unwrap_err();
    let json: serde_json::Value = serde_json::to_value(&err).unwrap();
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["message"].as_str().unwrap().contains("row 2"));
}

// ============================================================================
// Engine Scenarios
// ============================================================================

#[test]
fn test_scenario_simple_pair() {
    let augmented = compute_row_errors(&frame(&[100, 200], &[110, 180])).unwrap();
    let summary = compute_summary(&augmented).unwrap();

    assert_close(summary.mape(), 10.0);
    assert_close(summary.wmape(), 10.0);
    assert_close(summary.bias(), -5.0);
    assert_close(summary.forecast_accuracy(), 90.0);
}

#[test]
fn test_input_frame_is_not_mutated() {
    let df = frame(&[100, 200], &[110, 180]);
    let augmented = compute_row_errors(&df).unwrap();
    assert_eq!(df.width(), 2);
    assert_eq!(augmented.width(), 5);
}

#[test]
fn test_empty_dataset_is_no_data() {
    let augmented = compute_row_errors(&frame(&[], &[])).unwrap();
    assert!(matches!(compute_summary(&augmented), Err(MetricsError::NoData)));
    assert!(matches!(
        compute_error_histogram(&augmented, 5),
        Err(MetricsError::NoData)
    ));
}

#[test]
fn test_negative_actual_rejected() {
    let err = compute_row_errors(&frame(&[100, -5], &[90, 10])).unwrap_err();
    assert_eq!(err.row_index(), Some(1));
}

#[test]
fn test_identical_errors_widen_range() {
    let augmented = compute_row_errors(&frame(&[10, 20, 30], &[17, 27, 37])).unwrap();
    let histogram = compute_error_histogram(&augmented, 5).unwrap();

    assert!(histogram.widened);
    assert_eq!(histogram.total_count(), 3);
    assert!(histogram.bins.iter().all(|b| b.lower < b.upper));
}

// ============================================================================
// Synthetic Pipeline Tests
// ============================================================================

#[test]
fn test_same_seed_same_metrics() {
    let run = || {
        Pipeline::builder()
            .config(in_memory_config())
            .build()
            .unwrap()
            .run()
            .unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.histogram, second.histogram);
}

#[test]
fn test_parameter_change_is_a_fresh_run() {
    let run = |noise: u32| {
        let config = PipelineConfig::builder()
            .noise_level(noise)
            .render_charts(false)
            .build()
            .unwrap();
        Pipeline::builder().config(config).build().unwrap().run().unwrap()
    };
    let calm = run(0);
    let noisy = run(30);

    // Actuals do not depend on the noise level
    assert_eq!(
        numeric_column(&calm.dataset, "Actual").unwrap(),
        numeric_column(&noisy.dataset, "Actual").unwrap()
    );
    assert_ne!(calm.summary, noisy.summary);
}

#[test]
fn test_pipeline_analyze_dataframe() {
    let rows = SyntheticDataGenerator::new(150, 400, 15)
        .with_seed(11)
        .generate_rows()
        .unwrap();
    let df = rows_to_dataframe(&rows).unwrap();

    let result = Pipeline::builder()
        .config(in_memory_config())
        .build()
        .unwrap()
        .analyze(df)
        .unwrap();

    assert_eq!(result.dataset.height(), 150);
    assert_eq!(result.histogram.total_count(), 150);
}

#[test]
fn test_pipeline_with_charts_and_disk_output() {
    let dir = tempfile::tempdir().unwrap();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();

    let config = PipelineConfig::builder()
        .record_count(120)
        .save_to_disk(true)
        .output_dir(dir.path())
        .build()
        .unwrap();

    let result = Pipeline::builder()
        .config(config)
        .on_progress(move |update| sink.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert!(result.charts.is_some());
    assert_eq!(result.output_files.len(), 6);
    assert!(stages.lock().unwrap().contains(&AnalysisStage::RenderingCharts));

    let text = std::fs::read_to_string(dir.path().join("sop_report.txt")).unwrap();
    assert!(text.starts_with("Forecast Report - S&OP Metrics\n\nCalculated Metrics:\n"));

    let html = std::fs::read_to_string(dir.path().join("sop_report.html")).unwrap();
    assert!(html.contains("data:image/svg+xml;base64,"));

    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("sop_report_report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["row_count"], 120);
    assert!(report["metrics"]["Forecast_Accuracy"].is_number());

    let exported = sop_metrics::dataset::load_csv(dir.path().join("sop_report_data.csv")).unwrap();
    assert_eq!(exported.height(), 120);
    assert!(exported.column("Percentage_Error").is_ok());
}

// ============================================================================
// Property Tests
// ============================================================================

fn demand_pairs() -> impl Strategy<Value = Vec<(i64, i64)>> {
    proptest::collection::vec((0i64..10_000, -10_000i64..10_000), 1..200)
}

fn shuffled_demand_pairs() -> impl Strategy<Value = (Vec<(i64, i64)>, Vec<(i64, i64)>)> {
    demand_pairs().prop_flat_map(|pairs| (Just(pairs.clone()), Just(pairs).prop_shuffle()))
}

fn split(pairs: &[(i64, i64)]) -> DataFrame {
    let actual: Vec<i64> = pairs.iter().map(|(a, _)| *a).collect();
    let forecast: Vec<i64> = pairs.iter().map(|(_, f)| *f).collect();
    frame(&actual, &forecast)
}

proptest! {
    #[test]
    fn proptest_row_error_identities(pairs in demand_pairs()) {
        let augmented = compute_row_errors(&split(&pairs)).unwrap();
        let error = numeric_column(&augmented, "Error").unwrap();
        let absolute = numeric_column(&augmented, "Absolute_Error").unwrap();
        let percentage = numeric_column(&augmented, "Percentage_Error").unwrap();

        for (i, (actual, forecast)) in pairs.iter().enumerate() {
            let expected = (*forecast - *actual) as f64;
            prop_assert_eq!(error[i], expected);
            prop_assert_eq!(absolute[i], expected.abs());
            if *actual == 0 {
                prop_assert_eq!(percentage[i], 0.0);
            } else {
                prop_assert!((percentage[i] - expected.abs() / *actual as f64).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn proptest_accuracy_complements_mape(pairs in demand_pairs()) {
        let augmented = compute_row_errors(&split(&pairs)).unwrap();
        if let Ok(summary) = compute_summary(&augmented) {
            let total = summary.forecast_accuracy() + summary.mape();
            prop_assert!((total - 100.0).abs() < 1e-9 * summary.mape().abs().max(1.0));
            prop_assert!(summary.mape() >= 0.0);
            prop_assert!(summary.wmape() >= 0.0);
        } else {
            prop_assert!(pairs.iter().all(|(a, _)| *a == 0));
        }
    }

    #[test]
    fn proptest_histogram_counts_every_row(pairs in demand_pairs(), bins in 1usize..12) {
        let augmented = compute_row_errors(&split(&pairs)).unwrap();
        let histogram = compute_error_histogram(&augmented, bins).unwrap();

        prop_assert_eq!(histogram.bin_count(), bins);
        prop_assert_eq!(histogram.total_count(), pairs.len());
        for window in histogram.bins.windows(2) {
            prop_assert!(window[0].upper <= window[1].lower + 1e-9);
        }

        // The smallest error opens the first bin and the largest closes the last
        if !histogram.widened {
            prop_assert!(histogram.bins[0].count >= 1);
            prop_assert!(histogram.bins[bins - 1].count >= 1);

            let errors = numeric_column(&augmented, "Error").unwrap();
            let min = errors.iter().copied().fold(f64::INFINITY, f64::min);
            let max = errors.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(histogram.bins[0].lower < min && min <= histogram.bins[0].upper);
            prop_assert_eq!(histogram.bins[bins - 1].upper, max);
        }
    }

    #[test]
    fn proptest_summary_is_order_invariant((pairs, shuffled) in shuffled_demand_pairs()) {
        let in_order = compute_summary(&compute_row_errors(&split(&pairs)).unwrap());
        let permuted = compute_summary(&compute_row_errors(&split(&shuffled)).unwrap());

        match (in_order, permuted) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.error_code(), b.error_code()),
            _ => prop_assert!(false, "order changed the outcome"),
        }
    }
}
