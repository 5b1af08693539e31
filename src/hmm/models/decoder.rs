//! Regime decoding — state labels and posteriors for an observation sequence.
//!
//! Purpose
//! -------
//! Apply fitted [`HmmParams`] to a (typically out-of-sample) observation
//! matrix and produce one regime label per row, the full posterior matrix,
//! and the sequence log-likelihood. Parameters are never modified.
//!
//! Key behaviors
//! -------------
//! - `DecodeAlgorithm::MaxPosterior`: `label_t = argmax_k γ_t(k)`.
//! - `DecodeAlgorithm::Viterbi`: labels from the jointly most likely path;
//!   posteriors are still the forward–backward γ.
//! - Ties resolve to the lowest state index in both modes.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every posterior row sums to one within 1e-6 and every label is `< K`.
//! - Decoding is idempotent: identical inputs give identical outputs.
use crate::hmm::{
    core::{logspace::argmax_lowest, options::DecodeAlgorithm, params::HmmParams, validation},
    errors::{HmmError, HmmResult},
    models::inference::{
        backward, forward, log_emission_matrix, log_parameters, posteriors, viterbi,
    },
};
use ndarray::{Array2, ArrayView2};

/// Output of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeDecoding {
    /// Regime label per row, each in `[0, K)`.
    pub labels: Vec<usize>,
    /// Posterior state probabilities (T×K).
    pub posteriors: Array2<f64>,
    /// `ln p(obs | θ)`.
    pub log_likelihood: f64,
    /// Algorithm that produced `labels`.
    pub algorithm: DecodeAlgorithm,
}

impl RegimeDecoding {
    /// Number of decoded rows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of rows assigned to each state (length K).
    pub fn occupancy(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.posteriors.ncols()];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}

/// Decode `obs` under `params`.
///
/// Parameters
/// ----------
/// - `params`: `&HmmParams`
///   Fitted parameters (read-only).
/// - `obs`: `ArrayView2<f64>`
///   `T×D` observations; `T ≥ 1`, `D` equal to the fitted dimension.
/// - `algorithm`: `DecodeAlgorithm`
///
/// Errors
/// ------
/// - `HmmError::EmptySequence`, `HmmError::NoFeatures`,
///   `HmmError::NonFiniteObservation` from input validation.
/// - `HmmError::DimensionMismatch` when `obs.ncols() != D`.
/// - `HmmError::NonFiniteLogLikelihood` if the sequence has zero
///   probability under every state path.
pub fn decode(
    params: &HmmParams, obs: ArrayView2<f64>, algorithm: DecodeAlgorithm,
) -> HmmResult<RegimeDecoding> {
    validation::validate_observations(obs)?;
    if obs.ncols() != params.dim() {
        return Err(HmmError::DimensionMismatch { expected: params.dim(), actual: obs.ncols() });
    }
    let (log_start, log_trans) = log_parameters(params);
    let le = log_emission_matrix(params, obs);
    let (la, ll) = forward(&log_start, &log_trans, &le);
    if !ll.is_finite() {
        return Err(HmmError::NonFiniteLogLikelihood { iteration: 0, value: ll });
    }
    let lb = backward(&log_trans, &le);
    let gamma = posteriors(&la, &lb, ll);
    let labels = match algorithm {
        DecodeAlgorithm::MaxPosterior => {
            gamma.outer_iter().map(|row| argmax_lowest(row.iter())).collect()
        }
        DecodeAlgorithm::Viterbi => viterbi(&log_start, &log_trans, &le).0,
    };
    Ok(RegimeDecoding { labels, posteriors: gamma, log_likelihood: ll, algorithm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn params() -> HmmParams {
        HmmParams::from_raw(
            array![0.5, 0.5],
            array![[0.95, 0.05], [0.05, 0.95]],
            &array![[-2.0, 0.0], [2.0, 0.0]],
            vec![Array2::eye(2), Array2::eye(2)],
            1e-6,
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Both algorithms agree on a clearly separated sequence; posteriors
    // sum to one and decoding is idempotent.
    fn decoding_is_consistent_and_idempotent() {
        let p = params();
        let obs = array![[-2.1, 0.1], [-1.9, 0.0], [2.2, -0.1], [1.8, 0.2]];

        let mp = decode(&p, obs.view(), DecodeAlgorithm::MaxPosterior).unwrap();
        let vt = decode(&p, obs.view(), DecodeAlgorithm::Viterbi).unwrap();
        let again = decode(&p, obs.view(), DecodeAlgorithm::MaxPosterior).unwrap();

        assert_eq!(mp.labels, vec![0, 0, 1, 1]);
        assert_eq!(vt.labels, mp.labels);
        assert_eq!(again, mp);
        for row in mp.posteriors.outer_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-6);
        }
        assert_eq!(mp.occupancy(), vec![2, 2]);
    }

    #[test]
    // Purpose
    // -------
    // Exact posterior ties resolve to state 0.
    //
    // Given
    // -----
    // - A symmetric model and an observation equidistant from both means.
    fn ties_resolve_to_lowest_state() {
        let p = params();
        let obs = array![[0.0, 0.0]];

        let out = decode(&p, obs.view(), DecodeAlgorithm::MaxPosterior).unwrap();

        assert_eq!(out.labels, vec![0]);
    }

    #[test]
    // Purpose
    // -------
    // Wrong feature dimension and empty input are rejected.
    fn invalid_inputs_are_rejected() {
        let p = params();
        let wrong = array![[0.0, 0.0, 0.0]];
        let empty = Array2::<f64>::zeros((0, 2));

        assert_eq!(
            decode(&p, wrong.view(), DecodeAlgorithm::Viterbi).unwrap_err(),
            HmmError::DimensionMismatch { expected: 2, actual: 3 }
        );
        assert_eq!(
            decode(&p, empty.view(), DecodeAlgorithm::Viterbi).unwrap_err(),
            HmmError::EmptySequence
        );
    }
}
