//! The metrics engine.
//!
//! Three pure operations over a dataset snapshot, in dependency order:
//!
//! 1. [`compute_row_errors`] validates `Actual`/`Forecast` and appends
//!    `Error`, `Absolute_Error` and `Percentage_Error`.
//! 2. [`compute_summary`] reduces the augmented rows to MAPE, WMAPE and BIAS.
//! 3. [`compute_error_histogram`] bins the `Error` column for display.
//!
//! None of them performs I/O or mutates its input. Every aggregate is
//! summed in sorted order, so permuting the rows leaves the results
//! bit-for-bit unchanged.

mod histogram;
mod row_errors;
mod summary;

pub use histogram::{bin_values, compute_error_histogram};
pub use row_errors::{RowError, compute_row_errors, zero_actual_rows};
pub use summary::compute_summary;
