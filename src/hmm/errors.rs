//! Errors for Gaussian HMM estimation and decoding.
//!
//! This module defines the estimator/decoder error type, [`HmmError`], and the
//! non-fatal [`ConvergenceWarning`] attached to fit outcomes when the EM
//! iteration cap is reached before the log-likelihood tolerance is met.
//!
//! ## Conventions
//! - **Indices are 0-based**; `state` always refers to a hidden-state index in
//!   `[0, K)` and `t` to a row of the observation matrix.
//! - Singular covariances are recovered locally by diagonal regularization;
//!   [`HmmError::SingularCovariance`] is only surfaced once escalation has been
//!   exhausted, and it is fatal for the affected state count only.
//! - Probability-vector / matrix checks report the first offending row or entry.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for HMM estimation and decoding.
pub type HmmResult<T> = Result<T, HmmError>;

/// Unified error type for Gaussian HMM estimation and decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmmError {
    // ---- Model shape ----
    /// The requested number of hidden states must be at least 1.
    #[error("Number of hidden states must be >= 1; got {n_states}.")]
    InvalidStateCount { n_states: usize },

    /// Observations must have at least one feature column.
    #[error("Observation matrix must have at least one feature column.")]
    NoFeatures,

    /// Training needs at least as many observations as hidden states.
    #[error("Need at least {required} observations to fit {n_states} states; got {actual}.")]
    TooFewObservations { n_states: usize, required: usize, actual: usize },

    /// Decoding needs a non-empty observation sequence.
    #[error("Observation sequence is empty.")]
    EmptySequence,

    /// Observation dimension does not match the fitted emission dimension.
    #[error("Feature dimension mismatch: model expects {expected}, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An observation is NaN/±inf.
    #[error("Observation at row {t}, column {column} is non-finite: {value}")]
    NonFiniteObservation { t: usize, column: usize, value: f64 },

    // ---- Parameter validation ----
    /// Initial-state distribution has the wrong length.
    #[error("Initial-state distribution length mismatch: expected {expected}, got {actual}")]
    StartLengthMismatch { expected: usize, actual: usize },

    /// Transition matrix must be K×K.
    #[error("Transition matrix must be {expected}x{expected}; got {rows}x{cols}")]
    TransitionShapeMismatch { expected: usize, rows: usize, cols: usize },

    /// A probability entry is negative or non-finite.
    #[error("Probability at {location} index {index} must be finite and >= 0; got {value}")]
    InvalidProbability { location: &'static str, index: usize, value: f64 },

    /// A probability vector (or transition row) does not sum to one.
    #[error("{location} row {row} must sum to 1; got {sum}")]
    NotNormalized { location: &'static str, row: usize, sum: f64 },

    /// Number of emission components does not match the number of states.
    #[error("Expected {expected} emission components, got {actual}")]
    EmissionCountMismatch { expected: usize, actual: usize },

    /// Covariance matrix must be D×D.
    #[error("Covariance for state {state} must be {expected}x{expected}; got {rows}x{cols}")]
    CovarianceShapeMismatch { state: usize, expected: usize, rows: usize, cols: usize },

    /// Emission mean entries must be finite.
    #[error("Mean of state {state} has non-finite entry at {index}: {value}")]
    NonFiniteMean { state: usize, index: usize, value: f64 },

    // ---- Numerical ----
    /// Regularization escalation could not make a covariance positive-definite.
    #[error(
        "Covariance of state {state} is singular after {attempts} regularization attempts \
         (last diagonal floor {regularization})"
    )]
    SingularCovariance { state: usize, attempts: usize, regularization: f64 },

    /// Forward pass produced a non-finite log-likelihood.
    #[error("Log-likelihood became non-finite ({value}) at iteration {iteration}")]
    NonFiniteLogLikelihood { iteration: usize, value: f64 },

    // ---- Options ----
    /// EM iteration cap must be positive.
    #[error("Maximum EM iterations must be > 0; got {max_iter}")]
    InvalidMaxIter { max_iter: usize },

    /// EM tolerance must be finite and > 0.
    #[error("EM tolerance must be finite and > 0; got {tol}")]
    InvalidTolerance { tol: f64 },

    /// Covariance regularization must be finite and > 0.
    #[error("Covariance regularization must be finite and > 0; got {value}")]
    InvalidRegularization { value: f64 },

    /// Self-transition probability for the diagonal-bias init must lie in (0, 1).
    #[error("Diagonal-bias self-transition probability must lie in (0, 1); got {value}")]
    InvalidDiagonalBias { value: f64 },

    /// k-means initialization needs at least one iteration.
    #[error("k-means initialization needs at least one iteration.")]
    InvalidKMeansIterations,

    /// Unknown decoding algorithm name.
    #[error("Unknown decode algorithm '{name}'; expected 'max_posterior' or 'viterbi'")]
    InvalidDecodeAlgorithm { name: String },
}

/// Non-fatal diagnostic: EM stopped at the iteration cap before converging.
///
/// Attached to the fit outcome of the affected state count; the fitted
/// parameters are still returned and usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    /// Number of hidden states of the affected fit.
    pub n_states: usize,
    /// Iterations performed (equal to the configured cap).
    pub iterations: usize,
    /// Log-likelihood improvement over the final iteration (`+∞` when only
    /// one iteration ran).
    pub last_delta: f64,
    /// Tolerance that was not met.
    pub tolerance: f64,
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EM for K={} hit the iteration cap ({}) without converging: \
             Δℓ = {:.6e} >= tol {:.3e}",
            self.n_states, self.iterations, self.last_delta, self.tolerance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Check that the singular-covariance message names the state and the
    // escalation history so failed sweeps are diagnosable from logs.
    fn singular_covariance_message_names_state_and_attempts() {
        let err = HmmError::SingularCovariance { state: 2, attempts: 7, regularization: 1e3 };
        let msg = err.to_string();

        assert!(msg.contains("state 2"));
        assert!(msg.contains("7 regularization attempts"));
    }

    #[test]
    // Purpose
    // -------
    // Ensure the convergence warning renders K, the cap and the tolerance.
    fn convergence_warning_display_mentions_cap() {
        let warning =
            ConvergenceWarning { n_states: 4, iterations: 100, last_delta: 0.5, tolerance: 1e-2 };

        let msg = warning.to_string();

        assert!(msg.contains("K=4"));
        assert!(msg.contains("(100)"));
    }
}
