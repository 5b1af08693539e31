//! Log-space and matrix-conditioning utilities.
//!
//! Provides guarded implementations of the few nonlinear operations the
//! forward/backward recursions need, so that long observation sequences never
//! underflow and `-∞` (log of an exactly-zero probability) propagates without
//! producing NaN.
//!
//! # Provided items
//! - [`LOG_2PI`]: `ln(2π)`, used by the Gaussian log-density.
//! - [`NORMALIZATION_TOL`]: tolerance used when validating that probability
//!   vectors sum to one.
//! - [`log_sum_exp`]: stable `ln Σ exp(xᵢ)` over any iterator of `f64`.
//! - [`safe_ln`]: `ln(p)` that maps `p = 0` to `-∞` instead of NaN-prone
//!   epsilons.
//! - [`symmetrize`]: in-place `(A + Aᵀ) / 2`.
//! - [`argmax_lowest`]: index of the maximum, ties broken to the lowest index.
//! - [`normalize_in_place`]: rescale a non-negative vector to sum to one.
use ndarray::{Array2, ArrayViewMut1};

/// Natural log of 2π.
pub const LOG_2PI: f64 = 1.837_877_066_409_345_3;

/// Tolerance for "sums to one" checks on probability vectors and rows.
pub const NORMALIZATION_TOL: f64 = 1e-9;

/// Numerically stable `ln Σ exp(xᵢ)`.
///
/// Shifts by the maximum before exponentiating. If every input is `-∞` (or
/// the iterator is empty) the result is `-∞`.
///
/// # Parameters
/// - `values`: log-domain terms.
///
/// # Returns
/// - `ln Σ exp(xᵢ)` as `f64`.
pub fn log_sum_exp<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let max = iter.clone().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = iter.map(|x| (x - max).exp()).sum();
    max + sum.ln()
}

/// `ln(p)` for probabilities, mapping exact zeros to `-∞`.
pub fn safe_ln(p: f64) -> f64 {
    if p > 0.0 { p.ln() } else { f64::NEG_INFINITY }
}

/// Replace `a` by `(a + aᵀ) / 2` in place.
///
/// Floating-point accumulation in the weighted outer-product sum can leave
/// the covariance estimate asymmetric in the last bits; every covariance is
/// passed through here before it is factorized.
pub fn symmetrize(a: &mut Array2<f64>) {
    let n = a.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (a[[i, j]] + a[[j, i]]);
            a[[i, j]] = avg;
            a[[j, i]] = avg;
        }
    }
}

/// Index of the maximum entry; ties resolve to the lowest index.
///
/// NaN entries never win. Returns 0 for an empty or all-NaN input.
pub fn argmax_lowest<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut best_idx = 0;
    let mut best_val = f64::NEG_INFINITY;
    let mut seen = false;
    for (idx, &value) in values.into_iter().enumerate() {
        if !seen || value > best_val {
            if value.is_nan() {
                continue;
            }
            best_idx = idx;
            best_val = value;
            seen = true;
        }
    }
    best_idx
}

/// Rescale a non-negative vector so its entries sum to one.
///
/// Returns `false` and leaves the vector untouched when its sum is not
/// strictly positive and finite.
pub fn normalize_in_place(mut v: ArrayViewMut1<f64>) -> bool {
    let sum = v.sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return false;
    }
    v.mapv_inplace(|x| x / sum);
    true
}
