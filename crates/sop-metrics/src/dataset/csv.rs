//! CSV ingestion and export.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::DatasetSource;
use crate::error::{Result, ResultExt};
use crate::types::{ACTUAL_COLUMN, DATE_COLUMN, FORECAST_COLUMN};

const CANONICAL_COLUMNS: [&str; 3] = [DATE_COLUMN, ACTUAL_COLUMN, FORECAST_COLUMN];

/// Read a CSV file with a header row.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Failed to open {}", path.display()))?
        .finish()
        .context(format!("Failed to parse {}", path.display()))?;

    debug!("Loaded {}: {} rows x {} columns", path.display(), df.height(), df.width());
    Ok(df)
}

/// Rename `date`, `ACTUAL`, ` forecast ` and similar headers to the canonical
/// `Date`, `Actual` and `Forecast`. Other columns are left untouched.
pub fn normalize_column_names(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    for canonical in CANONICAL_COLUMNS {
        if names.iter().any(|name| name == canonical) {
            continue;
        }
        let matched = names
            .iter()
            .find(|name| name.trim().eq_ignore_ascii_case(canonical));
        if let Some(name) = matched {
            debug!("Renaming column '{}' to '{}'", name, canonical);
            df.rename(name, canonical.into())?;
        }
    }

    Ok(df)
}

/// Write a frame to CSV, creating parent directories as needed.
pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}

/// A dataset read from a CSV file with `Date`, `Actual` and `Forecast` columns.
///
/// Header matching is case-insensitive. Values are validated when the
/// metrics are computed, so a malformed cell surfaces as a validation error
/// with its row index.
#[derive(Debug, Clone)]
pub struct CsvDatasetSource {
    path: PathBuf,
}

impl CsvDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for CsvDatasetSource {
    fn load(&self) -> Result<DataFrame> {
        normalize_column_names(load_csv(&self.path)?)
    }

    fn describe(&self) -> String {
        format!("csv ({})", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::numeric_column;
    use std::io::Write;

    fn write_temp_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_normalize_column_names() {
        let df = df![
            "date" => ["2023-01-01"],
            "ACTUAL" => [100i64],
            " Forecast " => [110i64],
            "region" => ["north"],
        ]
        .unwrap();

        let df = normalize_column_names(df).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["Date", "Actual", "Forecast", "region"]);
    }

    #[test]
    fn test_csv_source_loads_and_normalizes() {
        let file = write_temp_csv("date,actual,forecast\n2023-01-01,100,110\n2023-01-02,200,180\n");
        let source = CsvDatasetSource::new(file.path());
        let df = source.load().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(numeric_column(&df, ACTUAL_COLUMN).unwrap(), vec![100.0, 200.0]);
        assert!(source.describe().starts_with("csv ("));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.csv");
        let mut df = df![
            "Actual" => [1i64, 2],
            "Forecast" => [3i64, 4],
        ]
        .unwrap();

        save_csv(&mut df, &path).unwrap();
        let reloaded = load_csv(&path).unwrap();
        assert_eq!(reloaded.height(), 2);
        assert_eq!(numeric_column(&reloaded, FORECAST_COLUMN).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_csv("does/not/exist.csv").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.csv"));
    }
}
