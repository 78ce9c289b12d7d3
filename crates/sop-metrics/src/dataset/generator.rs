//! Seeded synthetic demand data.

use chrono::{Days, NaiveDate};
use polars::prelude::DataFrame;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use super::{DatasetSource, rows_to_dataframe};
use crate::config::PipelineConfig;
use crate::error::{MetricsError, Result};
use crate::types::TimeSeriesRow;

/// Mean of the multiplicative forecast noise: forecasts under-shoot by 10%.
const FORECAST_SCALE_MEAN: f64 = 0.9;

/// Generates a daily demand series with a noisy forecast.
///
/// For row `i` (dated `start_date + i` days):
///
/// - `actual = max(0, round(N(mean_actual, mean_actual / 3)))`
/// - `forecast = trunc(actual * N(0.9, noise_level / 100) + mean_actual / 5)`
///
/// The same seed always yields the same rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataGenerator {
    record_count: usize,
    mean_actual: u32,
    noise_level: u32,
    seed: u64,
    start_date: NaiveDate,
}

impl SyntheticDataGenerator {
    pub fn new(record_count: usize, mean_actual: u32, noise_level: u32) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            record_count,
            mean_actual,
            noise_level,
            seed: defaults.seed,
            start_date: defaults.start_date,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            record_count: config.record_count,
            mean_actual: config.mean_actual,
            noise_level: config.noise_level,
            seed: config.seed,
            start_date: config.start_date,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }

    /// Generate the rows.
    pub fn generate_rows(&self) -> Result<Vec<TimeSeriesRow>> {
        let mean = f64::from(self.mean_actual);
        let actual_dist = Normal::new(mean, mean / 3.0)
            .map_err(|e| MetricsError::InvalidConfig(format!("actual distribution: {}", e)))?;
        let noise_dist = Normal::new(FORECAST_SCALE_MEAN, f64::from(self.noise_level) / 100.0)
            .map_err(|e| MetricsError::InvalidConfig(format!("noise distribution: {}", e)))?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        // All actuals are drawn before any noise so the actual series does
        // not depend on the noise level.
        let actuals: Vec<i64> = (0..self.record_count)
            .map(|_| actual_dist.sample(&mut rng).round_ties_even().max(0.0) as i64)
            .collect();

        let offset = mean / 5.0;
        let mut rows = Vec::with_capacity(self.record_count);
        for (i, actual) in actuals.into_iter().enumerate() {
            let date = self
                .start_date
                .checked_add_days(Days::new(i as u64))
                .ok_or_else(|| {
                    MetricsError::InvalidConfig(format!(
                        "date of row {} overflows the calendar",
                        i
                    ))
                })?;
            let scale = noise_dist.sample(&mut rng);
            let forecast = (actual as f64 * scale + offset).trunc() as i64;
            rows.push(TimeSeriesRow::new(date, actual, forecast));
        }

        debug!(
            "Generated {} rows (mean={}, noise={}%, seed={})",
            rows.len(),
            self.mean_actual,
            self.noise_level,
            self.seed
        );
        Ok(rows)
    }
}

impl DatasetSource for SyntheticDataGenerator {
    fn load(&self) -> Result<DataFrame> {
        rows_to_dataframe(&self.generate_rows()?)
    }

    fn describe(&self) -> String {
        format!(
            "synthetic ({} records, mean {}, noise {}%, seed {})",
            self.record_count, self.mean_actual, self.noise_level, self.seed
        )
    }
}
