//! hmm::core::emission — full-covariance Gaussian emission densities.
//!
//! Purpose
//! -------
//! Represent one state's emission distribution `N(μ, Σ)` with a cached
//! Cholesky factor so that the per-observation log-density is a triangular
//! solve plus a dot product. Every covariance passes through
//! [`condition_covariance`] before it is stored, which is the single place
//! where symmetry and positive-definiteness are enforced.
//!
//! Key behaviors
//! -------------
//! - Symmetrize the raw covariance (`(Σ + Σᵀ)/2`) to remove accumulation noise.
//! - Add the configured floor to the diagonal of every estimate, so the
//!   conditioned covariance is a continuous function of the raw one.
//! - Copy it into a `nalgebra::DMatrix` (`fill_dmatrix`) and factorize with
//!   Cholesky; on failure escalate the diagonal increment by a factor of 10
//!   up to [`MAX_REGULARIZATION_ATTEMPTS`] times before giving up with
//!   [`HmmError::SingularCovariance`].
//! - [`GaussianEmission::from_conditioned`] rebuilds an emission from an
//!   already-conditioned covariance (persisted parameters) without adding the
//!   floor again.
//! - Evaluate `ln N(x | μ, Σ)` by forward substitution against the cached
//!   lower-triangular factor.
//!
//! Invariants & assumptions
//! ------------------------
//! - A constructed [`GaussianEmission`] always holds a symmetric covariance
//!   whose Cholesky factorization succeeded, i.e. all eigenvalues are > 0.
//! - `mean.len() == covariance.nrows() == covariance.ncols() == D ≥ 1`.
//! - Constant features (zero variance) are handled by the floor: their
//!   diagonal entry becomes the floor and they contribute an identical
//!   log-density term to every state.
//! - Conditioning the same raw estimate twice gives bit-identical results.
//!
//! Conventions
//! -----------
//! - `log_det` is `ln |Σ| = 2 Σᵢ ln Lᵢᵢ` of the conditioned covariance.
//! - No explicit inverse is ever formed.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the standard-normal density, regularization of a
//!   rank-deficient covariance, symmetry of stored covariances, exhausted
//!   escalation on an indefinite matrix, and the singular error path for
//!   non-finite input.
use crate::hmm::{
    core::logspace::{symmetrize, LOG_2PI},
    errors::{HmmError, HmmResult},
};
use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array1, Array2, ArrayView1};

/// Maximum number of ×10 escalations of the diagonal floor after the first
/// Cholesky failure.
pub const MAX_REGULARIZATION_ATTEMPTS: usize = 6;

/// Multivariate Gaussian emission with cached Cholesky factor.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianEmission {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    chol_lower: Array2<f64>,
    log_det: f64,
    regularization: f64,
}

impl GaussianEmission {
    /// Build an emission for `state` from a raw mean and covariance.
    ///
    /// Parameters
    /// ----------
    /// - `state`: `usize`
    ///   Hidden-state index, used only for error reporting.
    /// - `mean`: `Array1<f64>`
    ///   Length-`D` mean; must be finite.
    /// - `covariance`: `Array2<f64>`
    ///   `D×D` raw covariance estimate; need not be exactly symmetric or
    ///   positive-definite.
    /// - `floor`: `f64`
    ///   Diagonal regularization floor (`covariance_regularization`).
    ///
    /// Returns
    /// -------
    /// `HmmResult<GaussianEmission>`
    ///   The conditioned emission, or an error if shapes disagree, the mean is
    ///   non-finite, or the covariance cannot be made positive-definite.
    ///
    /// Errors
    /// ------
    /// - `HmmError::CovarianceShapeMismatch` when `covariance` is not `D×D`.
    /// - `HmmError::NonFiniteMean` for NaN/±∞ mean entries.
    /// - `HmmError::SingularCovariance` when escalation is exhausted.
    pub fn new(
        state: usize, mean: Array1<f64>, covariance: Array2<f64>, floor: f64,
    ) -> HmmResult<Self> {
        check_shapes(state, &mean, &covariance)?;
        let conditioned = condition_covariance(state, covariance, floor)?;
        Ok(GaussianEmission::assemble(mean, conditioned))
    }

    /// Rebuild an emission whose covariance was conditioned earlier, e.g.
    /// read back from a model artifact. Only symmetrization and factorization
    /// are applied; no floor is added.
    ///
    /// # Errors
    /// - `HmmError::CovarianceShapeMismatch` / `HmmError::NonFiniteMean` as in
    ///   [`GaussianEmission::new`].
    /// - `HmmError::SingularCovariance` with `attempts = 1` if the stored
    ///   covariance is not positive-definite.
    pub fn from_conditioned(
        state: usize, mean: Array1<f64>, mut covariance: Array2<f64>,
    ) -> HmmResult<Self> {
        check_shapes(state, &mean, &covariance)?;
        let d = mean.len();
        let singular = HmmError::SingularCovariance { state, attempts: 1, regularization: 0.0 };
        if covariance.iter().any(|v| !v.is_finite()) {
            return Err(singular);
        }
        symmetrize(&mut covariance);
        let mut nalg = DMatrix::<f64>::zeros(d, d);
        fill_dmatrix(&covariance, &mut nalg);
        let lower = cholesky_lower(&nalg).ok_or(singular)?;
        Ok(GaussianEmission::assemble(
            mean,
            ConditionedCovariance { covariance, lower, regularization: 0.0 },
        ))
    }

    fn assemble(mean: Array1<f64>, conditioned: ConditionedCovariance) -> Self {
        let log_det = 2.0 * conditioned.lower.diag().iter().map(|l| l.ln()).sum::<f64>();
        GaussianEmission {
            mean,
            covariance: conditioned.covariance,
            chol_lower: conditioned.lower,
            log_det,
            regularization: conditioned.regularization,
        }
    }

    /// Feature dimension `D`.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Emission mean `μ`.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Conditioned (symmetric, positive-definite) covariance `Σ`.
    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// `ln |Σ|`.
    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    /// Total diagonal regularization that was added to the raw estimate.
    pub fn regularization(&self) -> f64 {
        self.regularization
    }

    /// `ln N(x | μ, Σ)`.
    ///
    /// Solves `L z = x − μ` by forward substitution, so the quadratic form is
    /// `zᵀz`. The caller guarantees `x.len() == D`.
    pub fn log_pdf(&self, x: ArrayView1<f64>) -> f64 {
        let d = self.dim();
        let mut z = Array1::<f64>::zeros(d);
        let mut quad = 0.0;
        for i in 0..d {
            let mut acc = x[i] - self.mean[i];
            for k in 0..i {
                acc -= self.chol_lower[[i, k]] * z[k];
            }
            let zi = acc / self.chol_lower[[i, i]];
            z[i] = zi;
            quad += zi * zi;
        }
        -0.5 * (d as f64 * LOG_2PI + self.log_det + quad)
    }
}

/// Output of [`condition_covariance`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedCovariance {
    /// Symmetric, positive-definite covariance.
    pub covariance: Array2<f64>,
    /// Lower Cholesky factor of `covariance`.
    pub lower: Array2<f64>,
    /// Total diagonal floor added to the raw estimate.
    pub regularization: f64,
}

/// Symmetrize, floor and factorize a raw covariance estimate.
///
/// Purpose
/// -------
/// Guarantee that every covariance handed to the emission density is
/// symmetric and positive-definite, recovering singular estimates by
/// diagonal regularization.
///
/// Parameters
/// ----------
/// - `state`: `usize`
///   State index for error reporting.
/// - `covariance`: `Array2<f64>`
///   Square raw estimate (consumed).
/// - `floor`: `f64`
///   Initial diagonal floor; must be finite and > 0.
///
/// Returns
/// -------
/// `HmmResult<ConditionedCovariance>`
///
/// Errors
/// ------
/// - `HmmError::SingularCovariance`
///   When the raw estimate contains non-finite entries, or Cholesky keeps
///   failing after [`MAX_REGULARIZATION_ATTEMPTS`] escalations.
///
/// Notes
/// -----
/// - The floor is added unconditionally, so `regularization ≥ floor` for
///   every returned covariance.
/// - Escalation multiplies the *increment* by 10 each time, so the total
///   added after `a` escalations is `floor · (1 + 10 + … + 10ᵃ)`.
pub fn condition_covariance(
    state: usize, mut covariance: Array2<f64>, floor: f64,
) -> HmmResult<ConditionedCovariance> {
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(HmmError::SingularCovariance { state, attempts: 0, regularization: 0.0 });
    }
    symmetrize(&mut covariance);
    let d = covariance.nrows();
    let mut nalg = DMatrix::<f64>::zeros(d, d);
    fill_dmatrix(&covariance, &mut nalg);
    add_to_diagonal(&mut covariance, &mut nalg, floor);

    let mut regularization = floor;
    let mut increment = floor;
    for attempt in 0..=MAX_REGULARIZATION_ATTEMPTS {
        if let Some(lower) = cholesky_lower(&nalg) {
            return Ok(ConditionedCovariance { covariance, lower, regularization });
        }
        if attempt == MAX_REGULARIZATION_ATTEMPTS {
            break;
        }
        increment *= 10.0;
        add_to_diagonal(&mut covariance, &mut nalg, increment);
        regularization += increment;
    }
    Err(HmmError::SingularCovariance {
        state,
        attempts: MAX_REGULARIZATION_ATTEMPTS + 1,
        regularization,
    })
}

// ---- Helper methods ----

/// Copy a square `ndarray` matrix into a preallocated `DMatrix`, column by
/// column to match nalgebra's storage order.
fn fill_dmatrix(src: &Array2<f64>, dst: &mut DMatrix<f64>) {
    let n = src.ncols();
    for j in 0..n {
        for i in 0..n {
            dst[(i, j)] = src[[i, j]];
        }
    }
}

fn check_shapes(state: usize, mean: &Array1<f64>, covariance: &Array2<f64>) -> HmmResult<()> {
    let d = mean.len();
    if covariance.nrows() != d || covariance.ncols() != d {
        return Err(HmmError::CovarianceShapeMismatch {
            state,
            expected: d,
            rows: covariance.nrows(),
            cols: covariance.ncols(),
        });
    }
    if let Some((index, &value)) = mean.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(HmmError::NonFiniteMean { state, index, value });
    }
    Ok(())
}

/// Lower Cholesky factor as an `ndarray` matrix, or `None` when the matrix is
/// not numerically positive-definite.
fn cholesky_lower(nalg: &DMatrix<f64>) -> Option<Array2<f64>> {
    let chol = Cholesky::new(nalg.clone())?;
    let l = chol.l();
    let d = nalg.nrows();
    let mut lower = Array2::<f64>::zeros((d, d));
    for j in 0..d {
        for i in j..d {
            lower[[i, j]] = l[(i, j)];
        }
    }
    let positive = lower.diag().iter().all(|v| *v > 0.0 && v.is_finite());
    positive.then_some(lower)
}

fn add_to_diagonal(covariance: &mut Array2<f64>, nalg: &mut DMatrix<f64>, amount: f64) {
    for i in 0..covariance.nrows() {
        covariance[[i, i]] += amount;
        nalg[(i, i)] += amount;
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
    // - The log-density of a standard bivariate normal.
    // - Regularization of a rank-deficient (constant-feature) covariance.
    // - Symmetry of the stored covariance.
    // - The unconditional floor and exhausted escalation.
    // - Rebuilding from a conditioned covariance.
    // - The singular error path.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check `log_pdf` against the closed form for N(0, I₂).
    //
    // Given
    // -----
    // - μ = 0, Σ = I, floor 1e-300 (vanishes against 1.0 in f64).
    //
    // Expect
    // ------
    // - ln N(0) = -ln(2π) and ln N([1,1]) = -ln(2π) - 1.
    fn log_pdf_matches_standard_normal() {
        let g = GaussianEmission::new(0, array![0.0, 0.0], Array2::eye(2), 1e-300).unwrap();

        assert_relative_eq!(g.log_pdf(array![0.0, 0.0].view()), -LOG_2PI, epsilon = 1e-12);
        assert_relative_eq!(g.log_pdf(array![1.0, 1.0].view()), -LOG_2PI - 1.0, epsilon = 1e-12);
        assert_eq!(g.regularization(), 1e-300);
    }

    #[test]
    // Purpose
    // -------
    // The floor is added to every estimate, including well-conditioned ones,
    // so the conditioned covariance moves continuously with the raw one.
    //
    // Given
    // -----
    // - Two raw covariances whose smallest eigenvalues sit just below and
    //   just above the floor.
    //
    // Expect
    // ------
    // - Both gain exactly the floor on the diagonal; their conditioned
    //   entries differ by the same amount as the raw ones.
    fn floor_is_added_continuously() {
        let floor = 1e-3;
        let below = condition_covariance(0, array![[1.0, 0.0], [0.0, 0.999e-3]], floor).unwrap();
        let above = condition_covariance(0, array![[1.0, 0.0], [0.0, 1.001e-3]], floor).unwrap();

        assert_eq!(below.regularization, floor);
        assert_eq!(above.regularization, floor);
        assert_relative_eq!(below.covariance[[1, 1]], 1.999e-3, epsilon = 1e-15);
        assert_relative_eq!(above.covariance[[1, 1]], 2.001e-3, epsilon = 1e-15);
        assert_relative_eq!(
            above.covariance[[1, 1]] - below.covariance[[1, 1]],
            2e-6,
            epsilon = 1e-15
        );
    }

    #[test]
    // Purpose
    // -------
    // An indefinite covariance that the escalated increments cannot repair
    // reports every attempt.
    //
    // Given
    // -----
    // - Σ = [[1, 2], [2, 1]] (eigenvalues 3 and -1), floor = 1e-300, so even
    //   the last increment of 1e-294 leaves it indefinite.
    //
    // Expect
    // ------
    // - `SingularCovariance { attempts: MAX_REGULARIZATION_ATTEMPTS + 1 }`
    //   with the accumulated regularization.
    fn exhausted_escalation_is_singular() {
        let err = condition_covariance(5, array![[1.0, 2.0], [2.0, 1.0]], 1e-300).unwrap_err();

        match err {
            HmmError::SingularCovariance { state, attempts, regularization } => {
                assert_eq!(state, 5);
                assert_eq!(attempts, MAX_REGULARIZATION_ATTEMPTS + 1);
                assert!(regularization >= 1e-294);
                assert!(regularization < 1e-293);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Rebuilding from an already-conditioned covariance keeps it unchanged,
    // and a stored indefinite matrix is rejected.
    fn from_conditioned_keeps_covariance() {
        let g = GaussianEmission::new(0, array![0.5, -0.5], array![[2.0, 0.3], [0.3, 1.0]], 1e-3)
            .unwrap();
        let restored =
            GaussianEmission::from_conditioned(0, g.mean().clone(), g.covariance().clone())
                .unwrap();

        assert_eq!(restored.covariance(), g.covariance());
        assert_relative_eq!(restored.log_det(), g.log_det(), epsilon = 1e-12);
        assert_eq!(restored.regularization(), 0.0);

        let err = GaussianEmission::from_conditioned(
            1,
            array![0.0, 0.0],
            array![[1.0, 2.0], [2.0, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, HmmError::SingularCovariance { state: 1, attempts: 1, .. }));
    }

    #[test]
    // Purpose
    // -------
    // A zero-variance feature must be rescued by the diagonal floor rather
    // than producing a singular-covariance error.
    //
    // Given
    // -----
    // - Σ = [[1, 0], [0, 0]] (second feature constant), floor = 1e-3.
    //
    // Expect
    // ------
    // - Construction succeeds, Σ₁₁ = 1e-3, Σ₀₀ = 1.001 and the log-density
    //   is finite.
    fn rank_deficient_covariance_is_floored() {
        let cov = array![[1.0, 0.0], [0.0, 0.0]];
        let g = GaussianEmission::new(1, array![0.0, 0.0], cov, 1e-3).unwrap();

        assert_relative_eq!(g.covariance()[[1, 1]], 1e-3, epsilon = 1e-15);
        assert_relative_eq!(g.covariance()[[0, 0]], 1.001, epsilon = 1e-15);
        assert!(g.log_pdf(array![0.5, 0.0].view()).is_finite());
        assert_eq!(g.regularization(), 1e-3);
    }

    #[test]
    // Purpose
    // -------
    // Asymmetric input (accumulation noise) is stored symmetric.
    fn stored_covariance_is_symmetric() {
        let cov = array![[2.0, 0.5 + 1e-12], [0.5, 1.0]];
        let g = GaussianEmission::new(0, array![0.0, 0.0], cov, 1e-6).unwrap();

        assert_eq!(g.covariance()[[0, 1]], g.covariance()[[1, 0]]);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite covariance entries cannot be regularized away.
    fn non_finite_covariance_is_singular() {
        let cov = array![[f64::NAN, 0.0], [0.0, 1.0]];
        let err = GaussianEmission::new(3, array![0.0, 0.0], cov, 1e-3).unwrap_err();

        assert!(matches!(err, HmmError::SingularCovariance { state: 3, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Shape mismatches between mean and covariance are reported.
    fn shape_mismatch_is_reported() {
        let err = GaussianEmission::new(0, array![0.0], Array2::eye(2), 1e-3).unwrap_err();
        assert_eq!(
            err,
            HmmError::CovarianceShapeMismatch { state: 0, expected: 1, rows: 2, cols: 2 }
        );
    }
}
