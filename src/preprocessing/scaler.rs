//! Train-only feature standardization.
//!
//! Purpose
//! -------
//! Fit per-feature location/scale on the training window only and apply the
//! same transform to both windows: `z = (x − mean) / std`.
//!
//! Key behaviors
//! -------------
//! - [`ScalerParams::fit`] computes the mean and population standard
//!   deviation of every column with `statrs::statistics::Statistics`.
//! - Features whose training standard deviation is (numerically) zero are
//!   *constant*: their scaled value is 0 in every row of every window.
//! - [`split_and_scale`] combines the chronological split with the scaler and
//!   logs a `warn` for each constant feature.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ScalerParams` depends on training rows only; test rows can be changed
//!   or dropped without affecting it.
//! - Inputs are finite; gap filling happens before this stage.
use crate::preprocessing::{
    errors::{PreprocessError, PreprocessResult},
    split::ChronoSplit,
};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use statrs::statistics::Statistics;
use tracing::{info, warn};

/// Standard deviations at or below this value mark a constant feature.
pub const CONSTANT_STD_TOL: f64 = 1e-12;

/// Per-feature standardization parameters fitted on the training window.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerParams {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl ScalerParams {
    /// Fit on `train` (rows = months, columns = features).
    ///
    /// # Errors
    /// - `PreprocessError::NoFeatures` for a zero-column matrix.
    /// - `PreprocessError::EmptyTrainWindow` for a zero-row matrix.
    /// - `PreprocessError::NonFiniteFeature` for NaN/±∞ entries.
    pub fn fit(train: ArrayView2<f64>) -> PreprocessResult<Self> {
        if train.ncols() == 0 {
            return Err(PreprocessError::NoFeatures);
        }
        if train.nrows() == 0 {
            return Err(PreprocessError::EmptyTrainWindow { rows: 0, fraction: f64::NAN });
        }
        check_finite(train)?;
        let mean = train.axis_iter(Axis(1)).map(|col| col.iter().mean()).collect::<Array1<f64>>();
        let std = train
            .axis_iter(Axis(1))
            .map(|col| col.iter().population_std_dev())
            .collect::<Array1<f64>>();
        Ok(ScalerParams { mean, std })
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Indices of features with zero training standard deviation.
    pub fn constant_features(&self) -> Vec<usize> {
        self.std
            .iter()
            .enumerate()
            .filter(|(_, sd)| **sd <= CONSTANT_STD_TOL)
            .map(|(j, _)| j)
            .collect()
    }

    /// Apply `z = (x − mean) / std`; constant features map to 0.
    ///
    /// # Errors
    /// - `PreprocessError::DimensionMismatch` if `x` has a different number of
    ///   columns.
    /// - `PreprocessError::NonFiniteFeature` for NaN/±∞ entries.
    pub fn transform(&self, x: ArrayView2<f64>) -> PreprocessResult<Array2<f64>> {
        if x.ncols() != self.dim() {
            return Err(PreprocessError::DimensionMismatch {
                expected: self.dim(),
                actual: x.ncols(),
            });
        }
        check_finite(x)?;
        let mut out = x.to_owned();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, sd) = (self.mean[j], self.std[j]);
            if sd <= CONSTANT_STD_TOL {
                col.fill(0.0);
            } else {
                col.mapv_inplace(|v| (v - m) / sd);
            }
        }
        Ok(out)
    }
}

/// Scaled training and test matrices plus the fitted transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSplit {
    pub split: ChronoSplit,
    pub scaler: ScalerParams,
    pub train: Array2<f64>,
    pub test: Array2<f64>,
}

/// Split `features` chronologically at `fraction` and standardize both windows
/// with parameters fitted on the training rows.
///
/// Parameters
/// ----------
/// - `features`: `ArrayView2<f64>`
///   Gap-free `T×D` feature matrix in time order.
/// - `fraction`: `f64`
///   Training share in `(0, 1)`.
///
/// Returns
/// -------
/// `PreprocessResult<ScaledSplit>`
///
/// Errors
/// ------
/// - Split errors from [`ChronoSplit::new`].
/// - Scale errors from [`ScalerParams::fit`] / [`ScalerParams::transform`].
pub fn split_and_scale(features: ArrayView2<f64>, fraction: f64) -> PreprocessResult<ScaledSplit> {
    let split = ChronoSplit::new(features.nrows(), fraction)?;
    let train_raw = features.slice(s![split.train_range(), ..]);
    let test_raw = features.slice(s![split.test_range(), ..]);
    let scaler = ScalerParams::fit(train_raw)?;
    for j in scaler.constant_features() {
        warn!(feature = j, "feature is constant over the training window; scaled to 0");
    }
    let train = scaler.transform(train_raw)?;
    let test = scaler.transform(test_raw).map_err(|e| match e {
        PreprocessError::NonFiniteFeature { row, column, value } => {
            PreprocessError::NonFiniteFeature { row: row + split.train_end, column, value }
        }
        other => other,
    })?;
    info!(
        train_rows = split.train_len(),
        test_rows = split.test_len(),
        "split and scaled features"
    );
    Ok(ScaledSplit { split, scaler, train, test })
}

fn check_finite(x: ArrayView2<f64>) -> PreprocessResult<()> {
    match x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, column), &value)) => {
            Err(PreprocessError::NonFiniteFeature { row, column, value })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Population mean/std on the training rows.
    // - The no-leakage property of the fitted scaler.
    // - The constant-feature rule.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Training columns are standardized to mean 0 and population std 1.
    fn train_columns_are_standardized() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [100.0, 0.0]];
        let out = split_and_scale(x.view(), 0.8).unwrap();

        assert_eq!(out.split.train_len(), 4);
        assert_relative_eq!(out.scaler.mean()[0], 2.5);
        assert_relative_eq!(out.scaler.std()[0], 1.25f64.sqrt(), epsilon = 1e-12);
        for col in out.train.axis_iter(Axis(1)) {
            assert_relative_eq!(col.sum(), 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(out.test[[0, 0]], (100.0 - 2.5) / 1.25f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Mutating or removing test rows never changes the fitted scaler.
    //
    // Given
    // -----
    // - The same 7 training rows followed by two different test windows.
    //
    // Expect
    // ------
    // - Identical ScalerParams.
    fn scaler_ignores_test_rows() {
        let base = Array2::from_shape_fn((10, 3), |(t, j)| (t * (j + 1)) as f64);
        let mut mutated = base.clone();
        mutated.slice_mut(s![7.., ..]).fill(1e9);

        let a = split_and_scale(base.view(), 0.7).unwrap();
        let b = split_and_scale(mutated.view(), 0.7).unwrap();
        let c = ScalerParams::fit(base.slice(s![..7, ..])).unwrap();

        assert_eq!(a.scaler, b.scaler);
        assert_eq!(a.scaler, c);
        assert_eq!(a.train, b.train);
    }

    #[test]
    // Purpose
    // -------
    // A constant training feature is scaled to 0 everywhere, including test
    // rows whose value differs.
    fn constant_feature_scales_to_zero() {
        let x = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0], [7.0, 4.0]];
        let out = split_and_scale(x.view(), 0.75).unwrap();

        assert_eq!(out.scaler.constant_features(), vec![0]);
        assert!(out.train.column(0).iter().all(|v| *v == 0.0));
        assert_eq!(out.test[[0, 0]], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite inputs are located in whole-panel row coordinates.
    fn non_finite_test_value_reports_panel_row() {
        let x = array![[1.0], [2.0], [3.0], [f64::NAN]];
        let err = split_and_scale(x.view(), 0.75).unwrap_err();

        assert!(matches!(err, PreprocessError::NonFiniteFeature { row: 3, column: 0, .. }));
    }
}
