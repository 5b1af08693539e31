//! Per-regime performance summary.
//!
//! Purpose
//! -------
//! Join a decoded regime sequence with the sector-return rows of the same
//! months and describe the returns observed under each regime. This is the
//! only place regime output meets portfolio data.
//!
//! Key behaviors
//! -------------
//! - One [`RegimePerformance`] per state `0..K`, including states that were
//!   never assigned (count 0, empty statistics).
//! - Statistics per sector column plus an [`EQUAL_WEIGHT_COLUMN`] built as
//!   the row mean of the available sector returns.
//! - Missing (`NaN`) returns are skipped column by column.
//! - Sharpe-like ratio: `mean / std · sqrt(periods_per_year)` with the sample
//!   standard deviation; absent when `std = 0` or fewer than two
//!   observations.
//!
//! Conventions
//! -----------
//! - Labels and return rows are paired positionally; the caller passes the
//!   test-window slice of the aligned returns.
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Name of the synthetic equal-weight portfolio column.
pub const EQUAL_WEIGHT_COLUMN: &str = "equal_weight";

/// Return statistics of one column under one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    /// Non-missing observations used.
    pub observations: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n − 1 denominator).
    pub std: Option<f64>,
    pub sharpe: Option<f64>,
}

/// All column statistics for one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimePerformance {
    pub regime: usize,
    /// Months labeled with this regime.
    pub count: usize,
    pub columns: Vec<ColumnStats>,
}

/// Performance of every regime of one fitted state count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub n_states: usize,
    pub periods_per_year: f64,
    pub regimes: Vec<RegimePerformance>,
}

/// Summarize `returns` by regime.
///
/// Parameters
/// ----------
/// - `labels`: `&[usize]`
///   Regime per test month, values in `[0, n_states)`.
/// - `n_states`: `usize`
/// - `returns`: `ArrayView2<f64>`
///   Test-window returns, one row per label, `NaN` for missing.
/// - `columns`: `&[String]`
///   Names of the return columns.
/// - `periods_per_year`: `f64`
///   Annualization factor for the Sharpe-like ratio.
///
/// Returns
/// -------
/// `PerformanceSummary` with exactly `n_states` regimes.
pub fn summarize_performance(
    labels: &[usize], n_states: usize, returns: ArrayView2<f64>, columns: &[String],
    periods_per_year: f64,
) -> PerformanceSummary {
    let equal_weight: Vec<f64> = returns
        .outer_iter()
        .map(|row| {
            let observed: Vec<f64> = row.iter().copied().filter(|v| v.is_finite()).collect();
            if observed.is_empty() {
                f64::NAN
            } else {
                observed.iter().sum::<f64>() / observed.len() as f64
            }
        })
        .collect();

    let regimes = (0..n_states)
        .map(|regime| {
            let rows: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == regime)
                .map(|(t, _)| t)
                .collect();
            let mut stats: Vec<ColumnStats> = columns
                .iter()
                .enumerate()
                .map(|(j, name)| {
                    let values = rows.iter().map(|&t| returns[[t, j]]);
                    column_stats(name, values, periods_per_year)
                })
                .collect();
            let ew = rows.iter().map(|&t| equal_weight[t]);
            stats.push(column_stats(EQUAL_WEIGHT_COLUMN, ew, periods_per_year));
            RegimePerformance { regime, count: rows.len(), columns: stats }
        })
        .collect();

    PerformanceSummary { n_states, periods_per_year, regimes }
}

fn column_stats(
    name: &str, values: impl Iterator<Item = f64>, periods_per_year: f64,
) -> ColumnStats {
    let observed: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    let n = observed.len();
    let mean = (n >= 1).then(|| observed.iter().mean());
    let std = (n >= 2).then(|| observed.iter().std_dev());
    let sharpe = match (mean, std) {
        (Some(m), Some(s)) if s > 0.0 => Some(m / s * periods_per_year.sqrt()),
        _ => None,
    };
    ColumnStats { column: name.to_string(), observations: n, mean, std, sharpe }
}
