//! HMM validation helpers — reusable checks for observations and parameters.
//!
//! Purpose
//! -------
//! Centralize the small sanity checks used by parameter constructors, the EM
//! estimator and the decoder so that every boundary fails fast with a
//! structured [`HmmError`] instead of propagating NaNs into the recursions.
//!
//! Invariants & assumptions
//! ------------------------
//! - Probability vectors and transition rows must be finite, non-negative and
//!   sum to one within [`NORMALIZATION_TOL`].
//! - Observation matrices are `T×D` with `D ≥ 1` and finite entries.
//!
//! Conventions
//! -----------
//! - Helpers return [`HmmResult`] and never panic on invalid inputs.
//! - No I/O and no logging.
use crate::hmm::{
    core::logspace::NORMALIZATION_TOL,
    errors::{HmmError, HmmResult},
};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Validate an observation matrix for decoding.
///
/// # Errors
/// - `HmmError::EmptySequence` if `T = 0`.
/// - `HmmError::NoFeatures` if `D = 0`.
/// - `HmmError::NonFiniteObservation` for the first NaN/±∞ entry.
pub fn validate_observations(obs: ArrayView2<f64>) -> HmmResult<()> {
    if obs.nrows() == 0 {
        return Err(HmmError::EmptySequence);
    }
    if obs.ncols() == 0 {
        return Err(HmmError::NoFeatures);
    }
    for ((t, column), &value) in obs.indexed_iter() {
        if !value.is_finite() {
            return Err(HmmError::NonFiniteObservation { t, column, value });
        }
    }
    Ok(())
}

/// Validate a training matrix for a `n_states`-state fit.
///
/// Adds to [`validate_observations`] the requirements `K ≥ 1` and `T ≥ K`.
pub fn validate_fit_inputs(obs: ArrayView2<f64>, n_states: usize) -> HmmResult<()> {
    if n_states == 0 {
        return Err(HmmError::InvalidStateCount { n_states });
    }
    validate_observations(obs)?;
    if obs.nrows() < n_states {
        return Err(HmmError::TooFewObservations {
            n_states,
            required: n_states,
            actual: obs.nrows(),
        });
    }
    Ok(())
}

/// Validate a probability vector of expected length `k`.
///
/// `location` names the vector in error messages (e.g. `"start_prob"`).
pub fn validate_probability_vector(
    v: ArrayView1<f64>, k: usize, location: &'static str,
) -> HmmResult<()> {
    if v.len() != k {
        return Err(HmmError::StartLengthMismatch { expected: k, actual: v.len() });
    }
    check_row(v, location, 0)
}

/// Validate a row-stochastic `k×k` transition matrix.
pub fn validate_transition_matrix(a: &Array2<f64>, k: usize) -> HmmResult<()> {
    if a.nrows() != k || a.ncols() != k {
        return Err(HmmError::TransitionShapeMismatch {
            expected: k,
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    for (row_idx, row) in a.outer_iter().enumerate() {
        check_row(row, "transmat", row_idx)?;
    }
    Ok(())
}

// ---- Helper methods ----

fn check_row(row: ArrayView1<f64>, location: &'static str, row_idx: usize) -> HmmResult<()> {
    for (index, &value) in row.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(HmmError::InvalidProbability { location, index, value });
        }
    }
    let sum = row.sum();
    if (sum - 1.0).abs() > NORMALIZATION_TOL {
        return Err(HmmError::NotNormalized { location, row: row_idx, sum });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Non-finite observations are reported with their coordinates.
    fn nan_observation_is_located() {
        let obs = array![[0.0, 1.0], [2.0, f64::NAN]];
        let err = validate_observations(obs.view()).unwrap_err();

        assert!(matches!(err, HmmError::NonFiniteObservation { t: 1, column: 1, .. }));
    }

    #[test]
    // Purpose
    // -------
    // A fit needs at least K rows.
    fn too_few_rows_for_state_count() {
        let obs = array![[0.0], [1.0]];
        let err = validate_fit_inputs(obs.view(), 3).unwrap_err();

        assert_eq!(err, HmmError::TooFewObservations { n_states: 3, required: 3, actual: 2 });
        assert_eq!(
            validate_fit_inputs(obs.view(), 0).unwrap_err(),
            HmmError::InvalidStateCount { n_states: 0 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Transition rows must each sum to one; the first bad row is reported.
    fn transition_rows_must_be_stochastic() {
        let good = array![[0.9, 0.1], [0.2, 0.8]];
        assert!(validate_transition_matrix(&good, 2).is_ok());

        let bad = array![[0.9, 0.1], [0.5, 0.6]];
        let err = validate_transition_matrix(&bad, 2).unwrap_err();
        assert!(matches!(err, HmmError::NotNormalized { row: 1, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Negative probabilities are rejected before the sum check.
    fn negative_probability_is_rejected() {
        let v = array![1.2, -0.2];
        let err = validate_probability_vector(v.view(), 2, "start_prob").unwrap_err();

        assert!(matches!(err, HmmError::InvalidProbability { index: 1, .. }));
    }
}
