//! Log-space forward–backward and Viterbi recursions.
//!
//! Purpose
//! -------
//! Implement the E-step quantities of Baum–Welch and both decoding paths
//! for a Gaussian HMM, entirely in log space so sequences of arbitrary length
//! never underflow.
//!
//! Key behaviors
//! -------------
//! - [`log_emission_matrix`]: `le[t, k] = ln N(x_t | μ_k, Σ_k)`.
//! - [`forward`]: `la[t, j] = le[t, j] + LSE_i(la[t−1, i] + ln A[i, j])`
//!   together with `ℓ = LSE_j la[T−1, j]`.
//! - [`backward`]: `lb[t, i] = LSE_j(ln A[i, j] + le[t+1, j] + lb[t+1, j])`,
//!   `lb[T−1, ·] = 0`.
//! - [`posteriors`]: `γ_t(k) = exp(la + lb − ℓ)`, renormalized per row.
//! - [`expected_transitions`]: `Σ_t ξ_t(i, j)` for the M-step.
//! - [`viterbi`]: max-product path with back-pointers, ties to the lowest
//!   state index.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs come from validated [`HmmParams`] and validated observations;
//!   these functions do not re-check shapes.
//! - `ln 0 = −∞` is allowed in `ln π` and `ln A`; LSE handles all-`−∞` rows.
//!
//! Conventions
//! -----------
//! - All matrices are `T×K` (time rows, state columns) except the `K×K`
//!   transition quantities.
use crate::hmm::core::{
    logspace::{argmax_lowest, log_sum_exp, normalize_in_place, safe_ln},
    params::HmmParams,
};
use ndarray::{Array1, Array2, ArrayView2};

/// Bundle of E-step outputs for one observation sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardBackward {
    /// Posterior state probabilities γ (T×K), rows sum to one.
    pub posteriors: Array2<f64>,
    /// Expected transition counts `Σ_t ξ_t(i, j)` (K×K).
    pub expected_transitions: Array2<f64>,
    /// Sequence log-likelihood `ln p(x_{0:T})`.
    pub log_likelihood: f64,
}

/// Element-wise `ln` of the start distribution and transition matrix.
pub fn log_parameters(params: &HmmParams) -> (Array1<f64>, Array2<f64>) {
    (params.start_prob().mapv(safe_ln), params.transmat().mapv(safe_ln))
}

/// `le[t, k] = ln N(x_t | μ_k, Σ_k)`.
pub fn log_emission_matrix(params: &HmmParams, obs: ArrayView2<f64>) -> Array2<f64> {
    let mut le = Array2::<f64>::zeros((obs.nrows(), params.n_states()));
    for (x, mut row) in obs.outer_iter().zip(le.outer_iter_mut()) {
        for (k, emission) in params.emissions().iter().enumerate() {
            row[k] = emission.log_pdf(x);
        }
    }
    le
}

/// Forward pass; returns `(la, ℓ)`.
pub fn forward(
    log_start: &Array1<f64>, log_trans: &Array2<f64>, le: &Array2<f64>,
) -> (Array2<f64>, f64) {
    let (t_len, k) = le.dim();
    let mut la = Array2::<f64>::from_elem((t_len, k), f64::NEG_INFINITY);
    for j in 0..k {
        la[[0, j]] = log_start[j] + le[[0, j]];
    }
    for t in 1..t_len {
        for j in 0..k {
            let prev = la.row(t - 1);
            let acc = log_sum_exp((0..k).map(|i| prev[i] + log_trans[[i, j]]));
            la[[t, j]] = le[[t, j]] + acc;
        }
    }
    let ll = log_sum_exp(la.row(t_len - 1).iter().copied());
    (la, ll)
}

/// Backward pass; returns `lb` with `lb[T−1, ·] = 0`.
pub fn backward(log_trans: &Array2<f64>, le: &Array2<f64>) -> Array2<f64> {
    let (t_len, k) = le.dim();
    let mut lb = Array2::<f64>::zeros((t_len, k));
    for t in (0..t_len.saturating_sub(1)).rev() {
        for i in 0..k {
            let next = lb.row(t + 1);
            let acc = log_sum_exp((0..k).map(|j| log_trans[[i, j]] + le[[t + 1, j]] + next[j]));
            lb[[t, i]] = acc;
        }
    }
    lb
}

/// `γ_t(k) = exp(la[t, k] + lb[t, k] − ℓ)`, rows renormalized to one.
pub fn posteriors(la: &Array2<f64>, lb: &Array2<f64>, ll: f64) -> Array2<f64> {
    let mut gamma = (la + lb).mapv(|v| (v - ll).exp());
    for row in gamma.outer_iter_mut() {
        normalize_in_place(row);
    }
    gamma
}

/// `Σ_{t=0}^{T−2} ξ_t(i, j)` with
/// `ξ_t(i, j) = exp(la[t, i] + ln A[i, j] + le[t+1, j] + lb[t+1, j] − ℓ)`.
pub fn expected_transitions(
    la: &Array2<f64>, lb: &Array2<f64>, le: &Array2<f64>, log_trans: &Array2<f64>, ll: f64,
) -> Array2<f64> {
    let (t_len, k) = le.dim();
    let mut xi = Array2::<f64>::zeros((k, k));
    for t in 0..t_len.saturating_sub(1) {
        for i in 0..k {
            let lai = la[[t, i]];
            if lai == f64::NEG_INFINITY {
                continue;
            }
            for j in 0..k {
                let v = lai + log_trans[[i, j]] + le[[t + 1, j]] + lb[[t + 1, j]] - ll;
                xi[[i, j]] += v.exp();
            }
        }
    }
    xi
}

/// Full E-step for one sequence.
pub fn forward_backward(params: &HmmParams, obs: ArrayView2<f64>) -> ForwardBackward {
    let (log_start, log_trans) = log_parameters(params);
    let le = log_emission_matrix(params, obs);
    let (la, ll) = forward(&log_start, &log_trans, &le);
    let lb = backward(&log_trans, &le);
    ForwardBackward {
        posteriors: posteriors(&la, &lb, ll),
        expected_transitions: expected_transitions(&la, &lb, &le, &log_trans, ll),
        log_likelihood: ll,
    }
}

/// Sequence log-likelihood only (forward pass).
pub fn log_likelihood(params: &HmmParams, obs: ArrayView2<f64>) -> f64 {
    let (log_start, log_trans) = log_parameters(params);
    let le = log_emission_matrix(params, obs);
    forward(&log_start, &log_trans, &le).1
}

/// Most likely state path and its joint log-probability.
///
/// Ties in both the recursion and the terminal step resolve to the lowest
/// state index.
pub fn viterbi(
    log_start: &Array1<f64>, log_trans: &Array2<f64>, le: &Array2<f64>,
) -> (Vec<usize>, f64) {
    let (t_len, k) = le.dim();
    let mut delta = Array2::<f64>::from_elem((t_len, k), f64::NEG_INFINITY);
    let mut back = Array2::<usize>::zeros((t_len, k));
    for j in 0..k {
        delta[[0, j]] = log_start[j] + le[[0, j]];
    }
    let mut scores = vec![f64::NEG_INFINITY; k];
    for t in 1..t_len {
        for j in 0..k {
            for (i, s) in scores.iter_mut().enumerate() {
                *s = delta[[t - 1, i]] + log_trans[[i, j]];
            }
            let best = argmax_lowest(scores.iter());
            back[[t, j]] = best;
            delta[[t, j]] = scores[best] + le[[t, j]];
        }
    }
    let mut path = vec![0usize; t_len];
    let last = argmax_lowest(delta.row(t_len - 1).iter());
    let score = delta[[t_len - 1, last]];
    path[t_len - 1] = last;
    for t in (1..t_len).rev() {
        path[t - 1] = back[[t, path[t]]];
    }
    (path, score)
}
