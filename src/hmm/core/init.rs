//! HMM initialization — seeded starting parameters for EM.
//!
//! Purpose
//! -------
//! Produce the starting point θ⁰ = (π⁰, A⁰, {μ⁰_k, Σ⁰_k}) for Baum–Welch from
//! the training observations and a seeded RNG. EM only finds a local optimum,
//! so the policy here largely decides which optimum is reached; keeping it
//! explicit and seeded is what makes sweeps reproducible.
//!
//! Key behaviors
//! -------------
//! - [`StartInit`]: uniform π⁰ (default) or a random draw normalized to one.
//! - [`TransitionInit`]: diagonal bias (self-transition `p`, remaining mass
//!   split evenly, default `p = 0.6`) or uniform rows.
//! - [`MeansInit`]: k-means++ seeding followed by Lloyd iterations (default)
//!   or K distinct training rows chosen at random.
//! - Covariances: every state starts from the empirical covariance of all
//!   training rows plus `floor · I`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Callers have validated the observations (finite, `T ≥ K`, `D ≥ 1`).
//! - For `K = 1` the transition matrix is `[[1]]` regardless of policy.
//! - Lloyd iterations keep the previous centroid for clusters that become
//!   empty; assignment ties go to the lowest centroid index.
//!
//! Conventions
//! -----------
//! - All randomness flows through the `StdRng` passed in; no global RNG.
use crate::hmm::{
    core::{logspace::argmax_lowest, options::EmOptions, params::HmmParams},
    errors::{HmmError, HmmResult},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{rngs::StdRng, seq::index::sample, Rng};
use serde::{Deserialize, Serialize};

/// Default self-transition probability of the diagonal-bias policy.
pub const DEFAULT_SELF_TRANSITION: f64 = 0.6;
/// Default number of Lloyd iterations after k-means++ seeding.
pub const DEFAULT_KMEANS_ITERATIONS: usize = 20;

/// Initial-state distribution policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartInit {
    #[default]
    Uniform,
    Random,
}

/// Transition-matrix policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionInit {
    /// `A[i][i] = self_prob`, `A[i][j] = (1 − self_prob)/(K − 1)`.
    DiagonalBias { self_prob: f64 },
    Uniform,
}

impl Default for TransitionInit {
    fn default() -> Self {
        TransitionInit::DiagonalBias { self_prob: DEFAULT_SELF_TRANSITION }
    }
}

/// Emission-mean policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeansInit {
    #[serde(rename = "kmeans")]
    KMeansPlusPlus { iterations: usize },
    RandomSample,
}

impl Default for MeansInit {
    fn default() -> Self {
        MeansInit::KMeansPlusPlus { iterations: DEFAULT_KMEANS_ITERATIONS }
    }
}

/// Bundle of initialization policies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitOptions {
    pub start: StartInit,
    pub transition: TransitionInit,
    pub means: MeansInit,
}

impl InitOptions {
    /// Check policy parameters.
    ///
    /// # Errors
    /// - `HmmError::InvalidDiagonalBias` if `self_prob ∉ (0, 1)`.
    /// - `HmmError::InvalidKMeansIterations` if `iterations == 0`.
    pub fn validate(&self) -> HmmResult<()> {
        if let TransitionInit::DiagonalBias { self_prob } = self.transition {
            if !(self_prob > 0.0 && self_prob < 1.0) {
                return Err(HmmError::InvalidDiagonalBias { value: self_prob });
            }
        }
        if let MeansInit::KMeansPlusPlus { iterations: 0 } = self.means {
            return Err(HmmError::InvalidKMeansIterations);
        }
        Ok(())
    }
}

/// Build starting parameters for a `n_states`-state fit.
///
/// Parameters
/// ----------
/// - `obs`: `ArrayView2<f64>`
///   Validated training observations (T×D).
/// - `n_states`: `usize`
///   Number of hidden states K.
/// - `opts`: `&EmOptions`
///   Supplies the init policies and the covariance floor.
/// - `rng`: `&mut StdRng`
///   Seeded generator; consumed in a fixed order (start, means).
///
/// Errors
/// ------
/// - Propagates `HmmError::SingularCovariance` if even the regularized
///   empirical covariance cannot be factorized.
pub fn initial_params(
    obs: ArrayView2<f64>, n_states: usize, opts: &EmOptions, rng: &mut StdRng,
) -> HmmResult<HmmParams> {
    let start = initial_start(n_states, opts.init.start, rng);
    let transmat = initial_transmat(n_states, opts.init.transition);
    let means = match opts.init.means {
        MeansInit::KMeansPlusPlus { iterations } => kmeans(obs, n_states, iterations, rng),
        MeansInit::RandomSample => random_rows(obs, n_states, rng),
    };
    let covariances = vec![empirical_covariance(obs); n_states];
    HmmParams::from_raw(start, transmat, &means, covariances, opts.covariance_regularization)
}

/// Initial-state distribution for `k` states.
pub fn initial_start(k: usize, policy: StartInit, rng: &mut StdRng) -> Array1<f64> {
    let uniform = Array1::from_elem(k, 1.0 / k as f64);
    match policy {
        StartInit::Uniform => uniform,
        StartInit::Random => {
            let draws = Array1::from_shape_fn(k, |_| rng.gen::<f64>());
            let sum = draws.sum();
            if sum > 0.0 { draws / sum } else { uniform }
        }
    }
}

/// Initial transition matrix for `k` states.
pub fn initial_transmat(k: usize, policy: TransitionInit) -> Array2<f64> {
    if k == 1 {
        return Array2::ones((1, 1));
    }
    match policy {
        TransitionInit::Uniform => Array2::from_elem((k, k), 1.0 / k as f64),
        TransitionInit::DiagonalBias { self_prob } => {
            let off = (1.0 - self_prob) / (k - 1) as f64;
            Array2::from_shape_fn((k, k), |(i, j)| if i == j { self_prob } else { off })
        }
    }
}

/// Population covariance of the rows of `obs` (divides by T).
pub fn empirical_covariance(obs: ArrayView2<f64>) -> Array2<f64> {
    let t = obs.nrows() as f64;
    let d = obs.ncols();
    let mean = obs.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
    let centered = &obs - &mean;
    centered.t().dot(&centered) / t
}

/// k-means++ seeding followed by `iterations` Lloyd steps.
///
/// Returns the K×D centroid matrix, rows ordered by seeding order.
pub fn kmeans(obs: ArrayView2<f64>, k: usize, iterations: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = obs.nrows();
    let d = obs.ncols();
    let mut centers = Array2::<f64>::zeros((k, d));

    // k-means++ seeding
    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&obs.row(first));
    let mut nearest: Vec<f64> = obs.outer_iter().map(|x| sq_dist(x, centers.row(0))).collect();
    for c in 1..k {
        let total: f64 = nearest.iter().sum();
        let pick = if total > 0.0 && total.is_finite() {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = n - 1;
            for (idx, w) in nearest.iter().enumerate() {
                acc += w;
                if acc > target {
                    chosen = idx;
                    break;
                }
            }
            chosen
        } else {
            rng.gen_range(0..n)
        };
        centers.row_mut(c).assign(&obs.row(pick));
        for (dist, x) in nearest.iter_mut().zip(obs.outer_iter()) {
            *dist = dist.min(sq_dist(x, centers.row(c)));
        }
    }

    // Lloyd refinement
    let mut labels = vec![usize::MAX; n];
    for _ in 0..iterations {
        let mut changed = false;
        for (t, x) in obs.outer_iter().enumerate() {
            let neg: Vec<f64> = centers.outer_iter().map(|c| -sq_dist(x, c)).collect();
            let best = argmax_lowest(neg.iter());
            if labels[t] != best {
                labels[t] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        let mut sums = Array2::<f64>::zeros((k, d));
        let mut counts = vec![0usize; k];
        for (x, &label) in obs.outer_iter().zip(&labels) {
            let mut row = sums.row_mut(label);
            row += &x;
            counts[label] += 1;
        }
        for (c, &count) in counts.iter().enumerate() {
            if count > 0 {
                let centroid = &sums.row(c) / count as f64;
                centers.row_mut(c).assign(&centroid);
            }
        }
    }
    centers
}

fn random_rows(obs: ArrayView2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let picks = sample(rng, obs.nrows(), k);
    let mut out = Array2::<f64>::zeros((k, obs.ncols()));
    for (mut row, idx) in out.outer_iter_mut().zip(picks.iter()) {
        row.assign(&obs.row(idx));
    }
    out
}

fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::SeedableRng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Shapes and normalization of the start and transition policies.
    // - The K = 1 transition special case.
    // - k-means recovery of two well-separated clusters.
    // - Determinism of `initial_params` under a fixed seed.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Diagonal bias puts `p` on the diagonal and splits the rest evenly.
    fn diagonal_bias_rows_sum_to_one() {
        let a = initial_transmat(4, TransitionInit::default());

        assert_relative_eq!(a[[0, 0]], 0.6);
        assert_relative_eq!(a[[0, 1]], 0.4 / 3.0);
        for row in a.outer_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        assert_eq!(initial_transmat(1, TransitionInit::Uniform), array![[1.0]]);
    }

    #[test]
    // Purpose
    // -------
    // The random start distribution is a valid probability vector.
    fn random_start_is_normalized() {
        let mut rng = StdRng::seed_from_u64(7);
        let pi = initial_start(5, StartInit::Random, &mut rng);

        assert_relative_eq!(pi.sum(), 1.0, epsilon = 1e-12);
        assert!(pi.iter().all(|p| *p >= 0.0));
    }

    #[test]
    // Purpose
    // -------
    // k-means separates two tight, distant clusters.
    //
    // Given
    // -----
    // - Three points near (0, 0) and three near (10, 10).
    //
    // Expect
    // ------
    // - One centroid near each cluster mean.
    fn kmeans_finds_separated_clusters() {
        let obs = array![
            [0.0, 0.0],
            [0.1, -0.1],
            [-0.1, 0.1],
            [10.0, 10.0],
            [10.1, 9.9],
            [9.9, 10.1]
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let centers = kmeans(obs.view(), 2, 20, &mut rng);

        let mut firsts: Vec<f64> = centers.column(0).to_vec();
        firsts.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(firsts[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(firsts[1], 10.0, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Same seed and data give identical starting parameters.
    fn initial_params_are_deterministic() {
        let obs = Array2::from_shape_fn((30, 2), |(t, j)| ((t * 7 + j * 3) % 11) as f64);
        let opts = EmOptions::default();

        let a = initial_params(obs.view(), 3, &opts, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = initial_params(obs.view(), 3, &opts, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    // Purpose
    // -------
    // Invalid policy parameters are rejected.
    fn invalid_policies_are_rejected() {
        let bad_bias = InitOptions {
            transition: TransitionInit::DiagonalBias { self_prob: 1.0 },
            ..InitOptions::default()
        };
        assert!(matches!(bad_bias.validate(), Err(HmmError::InvalidDiagonalBias { .. })));

        let bad_kmeans = InitOptions {
            means: MeansInit::KMeansPlusPlus { iterations: 0 },
            ..Default::default()
        };
        assert_eq!(bad_kmeans.validate(), Err(HmmError::InvalidKMeansIterations));
    }
}
