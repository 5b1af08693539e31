//! HMM parameters — validated container for (π, A, {μ_k, Σ_k}).
//!
//! Purpose
//! -------
//! Own the complete parameter set of a K-state Gaussian HMM and guarantee its
//! invariants at construction time, so the recursions in
//! `hmm::models::inference` can assume well-formed inputs.
//!
//! Key behaviors
//! -------------
//! - [`HmmParams::new`] validates the start distribution, the transition
//!   matrix and the emission list (count and common dimension).
//! - [`HmmParams::from_raw`] builds the emissions from raw means and
//!   covariances, conditioning each covariance with the configured floor;
//!   initialization goes through here.
//! - [`HmmParams::n_free_parameters`] counts free parameters for AIC/BIC.
//! - [`HmmParamsSnapshot`] is the plain serde form written to the model
//!   artifact and read back by [`HmmParams::from_snapshot`], which keeps the
//!   stored covariances as they are.
//!
//! Invariants & assumptions
//! ------------------------
//! - `start_prob` has length K, is non-negative and sums to 1 (±1e-9).
//! - `transmat` is K×K and every row sums to 1 (±1e-9).
//! - All K emissions share the same dimension D, and each covariance is
//!   symmetric positive-definite (enforced by `GaussianEmission`).
//!
//! Conventions
//! -----------
//! - `transmat[[i, j]] = P(z_{t+1} = j | z_t = i)`.
//! - Free parameter count:
//!   `(K−1) + K(K−1) + K·D + K·D(D+1)/2`.
use crate::hmm::{
    core::{
        emission::GaussianEmission,
        validation::{validate_probability_vector, validate_transition_matrix},
    },
    errors::{HmmError, HmmResult},
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Complete, validated parameter set of a Gaussian HMM.
#[derive(Debug, Clone, PartialEq)]
pub struct HmmParams {
    start_prob: Array1<f64>,
    transmat: Array2<f64>,
    emissions: Vec<GaussianEmission>,
}

impl HmmParams {
    /// Build a parameter set from already-conditioned emissions.
    ///
    /// Parameters
    /// ----------
    /// - `start_prob`: `Array1<f64>`
    ///   Initial-state distribution π (length K).
    /// - `transmat`: `Array2<f64>`
    ///   Row-stochastic transition matrix A (K×K).
    /// - `emissions`: `Vec<GaussianEmission>`
    ///   One emission per state, all of the same dimension.
    ///
    /// Errors
    /// ------
    /// - `HmmError::InvalidStateCount` if `start_prob` is empty.
    /// - Probability/shape errors from the validation helpers.
    /// - `HmmError::EmissionCountMismatch` / `HmmError::DimensionMismatch`
    ///   for inconsistent emission lists.
    pub fn new(
        start_prob: Array1<f64>, transmat: Array2<f64>, emissions: Vec<GaussianEmission>,
    ) -> HmmResult<Self> {
        let k = start_prob.len();
        if k == 0 {
            return Err(HmmError::InvalidStateCount { n_states: 0 });
        }
        validate_probability_vector(start_prob.view(), k, "start_prob")?;
        validate_transition_matrix(&transmat, k)?;
        if emissions.len() != k {
            return Err(HmmError::EmissionCountMismatch { expected: k, actual: emissions.len() });
        }
        let d = emissions[0].dim();
        if d == 0 {
            return Err(HmmError::NoFeatures);
        }
        if let Some(bad) = emissions.iter().find(|e| e.dim() != d) {
            return Err(HmmError::DimensionMismatch { expected: d, actual: bad.dim() });
        }
        Ok(HmmParams { start_prob, transmat, emissions })
    }

    /// Build a parameter set from raw means (K×D) and covariances, conditioning
    /// every covariance with `floor`.
    pub fn from_raw(
        start_prob: Array1<f64>, transmat: Array2<f64>, means: &Array2<f64>,
        covariances: Vec<Array2<f64>>, floor: f64,
    ) -> HmmResult<Self> {
        if covariances.len() != means.nrows() {
            return Err(HmmError::EmissionCountMismatch {
                expected: means.nrows(),
                actual: covariances.len(),
            });
        }
        let emissions = means
            .outer_iter()
            .zip(covariances)
            .enumerate()
            .map(|(state, (mean, cov))| GaussianEmission::new(state, mean.to_owned(), cov, floor))
            .collect::<HmmResult<Vec<_>>>()?;
        HmmParams::new(start_prob, transmat, emissions)
    }

    /// Rebuild parameters from a persisted snapshot. Covariances were
    /// conditioned when fitted and are restored without another floor.
    pub fn from_snapshot(snapshot: &HmmParamsSnapshot) -> HmmResult<Self> {
        let k = snapshot.start_prob.len();
        let d = snapshot.means.first().map_or(0, Vec::len);
        let transmat = rows_to_array(&snapshot.transmat, k, k).ok_or(
            HmmError::TransitionShapeMismatch {
                expected: k,
                rows: snapshot.transmat.len(),
                cols: snapshot.transmat.first().map_or(0, Vec::len),
            },
        )?;
        let means = rows_to_array(&snapshot.means, k, d).ok_or(HmmError::EmissionCountMismatch {
            expected: k,
            actual: snapshot.means.len(),
        })?;
        if snapshot.covariances.len() != k {
            return Err(HmmError::EmissionCountMismatch {
                expected: k,
                actual: snapshot.covariances.len(),
            });
        }
        let emissions = snapshot
            .covariances
            .iter()
            .zip(means.outer_iter())
            .enumerate()
            .map(|(state, (rows, mean))| {
                let cov = rows_to_array(rows, d, d).ok_or(HmmError::CovarianceShapeMismatch {
                    state,
                    expected: d,
                    rows: rows.len(),
                    cols: rows.first().map_or(0, Vec::len),
                })?;
                GaussianEmission::from_conditioned(state, mean.to_owned(), cov)
            })
            .collect::<HmmResult<Vec<_>>>()?;
        HmmParams::new(Array1::from(snapshot.start_prob.clone()), transmat, emissions)
    }

    /// Plain serde representation of the parameters.
    pub fn to_snapshot(&self) -> HmmParamsSnapshot {
        HmmParamsSnapshot {
            start_prob: self.start_prob.to_vec(),
            transmat: self.transmat.outer_iter().map(|r| r.to_vec()).collect(),
            means: self.emissions.iter().map(|e| e.mean().to_vec()).collect(),
            covariances: self
                .emissions
                .iter()
                .map(|e| e.covariance().outer_iter().map(|r| r.to_vec()).collect())
                .collect(),
        }
    }

    /// Number of hidden states K.
    pub fn n_states(&self) -> usize {
        self.start_prob.len()
    }

    /// Feature dimension D.
    pub fn dim(&self) -> usize {
        self.emissions[0].dim()
    }

    pub fn start_prob(&self) -> &Array1<f64> {
        &self.start_prob
    }

    pub fn transmat(&self) -> &Array2<f64> {
        &self.transmat
    }

    pub fn emissions(&self) -> &[GaussianEmission] {
        &self.emissions
    }

    /// Emission means stacked as a K×D matrix.
    pub fn means(&self) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((self.n_states(), self.dim()));
        for (mut row, e) in out.outer_iter_mut().zip(&self.emissions) {
            row.assign(e.mean());
        }
        out
    }

    /// Free-parameter count `(K−1) + K(K−1) + K·D + K·D(D+1)/2`.
    pub fn n_free_parameters(&self) -> usize {
        free_parameter_count(self.n_states(), self.dim())
    }
}

/// Free-parameter count of a full-covariance Gaussian HMM with `k` states in
/// `d` dimensions.
pub fn free_parameter_count(k: usize, d: usize) -> usize {
    (k - 1) + k * (k - 1) + k * d + k * d * (d + 1) / 2
}

/// Serializable view of [`HmmParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmmParamsSnapshot {
    pub start_prob: Vec<f64>,
    pub transmat: Vec<Vec<f64>>,
    pub means: Vec<Vec<f64>>,
    pub covariances: Vec<Vec<Vec<f64>>>,
}

fn rows_to_array(rows: &[Vec<f64>], nrows: usize, ncols: usize) -> Option<Array2<f64>> {
    if rows.len() != nrows || rows.iter().any(|r| r.len() != ncols) {
        return None;
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((nrows, ncols), flat).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_state_params() -> HmmParams {
        HmmParams::from_raw(
            array![0.5, 0.5],
            array![[0.9, 0.1], [0.2, 0.8]],
            &array![[-1.0, 0.0], [1.0, 0.0]],
            vec![Array2::eye(2), Array2::eye(2)],
            1e-6,
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Free-parameter count matches the closed form for K=2, D=2:
    // 1 + 2 + 4 + 6 = 13.
    fn free_parameter_count_matches_formula() {
        assert_eq!(two_state_params().n_free_parameters(), 13);
        assert_eq!(free_parameter_count(1, 1), 2);
    }

    #[test]
    // Purpose
    // -------
    // Snapshots reproduce the same parameters when read back, without a
    // second diagonal floor on the covariances.
    fn snapshot_restores_parameters() {
        let params = two_state_params();
        let json = serde_json::to_string(&params.to_snapshot()).unwrap();
        let snapshot: HmmParamsSnapshot = serde_json::from_str(&json).unwrap();

        let restored = HmmParams::from_snapshot(&snapshot).unwrap();

        assert_eq!(restored.transmat(), params.transmat());
        assert_eq!(restored.means(), params.means());
        for (a, b) in restored.emissions().iter().zip(params.emissions()) {
            assert_eq!(a.covariance(), b.covariance());
        }
    }

    #[test]
    // Purpose
    // -------
    // Emission count must equal K.
    fn emission_count_mismatch_is_rejected() {
        let e = GaussianEmission::new(0, array![0.0], Array2::eye(1), 1e-6).unwrap();
        let err = HmmParams::new(array![0.5, 0.5], array![[0.5, 0.5], [0.5, 0.5]], vec![e])
            .unwrap_err();

        assert_eq!(err, HmmError::EmissionCountMismatch { expected: 2, actual: 1 });
    }
}
