//! Public seam between the regime sweep and the sequence model it drives.
//!
//! - [`SequenceModel`]: fit on training observations, decode any
//!   observation sequence with the fitted parameters.
//! - [`FitOutcome`]: fitted parameters plus EM diagnostics, generic over the
//!   model's parameter type.
//!
//! The sweep controller is generic over this trait; [`GaussianHmm`] is the
//! only implementation shipped here. Another emission family plugs in by
//! choosing its own `Params` type.
//!
//! [`GaussianHmm`]: crate::hmm::models::GaussianHmm
use crate::hmm::{
    core::params::HmmParams,
    errors::{ConvergenceWarning, HmmResult},
    models::decoder::RegimeDecoding,
};
use ndarray::ArrayView2;

/// Result of one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome<P = HmmParams> {
    /// Fitted parameters.
    pub params: P,
    /// Training log-likelihood of `params`.
    pub log_likelihood: f64,
    /// EM iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was met before the cap.
    pub converged: bool,
    /// Present when the iteration cap was reached.
    pub warning: Option<ConvergenceWarning>,
    /// E-step log-likelihood per iteration.
    pub history: Vec<f64>,
}

/// A latent-state sequence model with a fixed number of states.
///
/// Required:
/// - `Params`: the fitted parameter set.
/// - `n_states()`: number of hidden states K.
/// - `free_parameters(params)`: free-parameter count used by AIC/BIC.
/// - `fit(train)`: estimate parameters on a `T×D` training matrix. Must be
///   deterministic for fixed inputs and options.
/// - `decode(params, obs)`: assign a state to every row of `obs` and return
///   posteriors plus the sequence log-likelihood. Must be pure: decoding the
///   same sequence twice yields identical results.
pub trait SequenceModel {
    type Params;

    fn n_states(&self) -> usize;
    fn free_parameters(&self, params: &Self::Params) -> usize;
    fn fit(&self, train: ArrayView2<f64>) -> HmmResult<FitOutcome<Self::Params>>;
    fn decode(&self, params: &Self::Params, obs: ArrayView2<f64>) -> HmmResult<RegimeDecoding>;
}
