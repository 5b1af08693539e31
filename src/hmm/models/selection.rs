//! Information criteria for comparing fits across state counts.
//!
//! For a fit with `p` free parameters, training log-likelihood `ℓ` and `T`
//! training rows:
//! - `AIC = 2p − 2ℓ`
//! - `BIC = p·ln T − 2ℓ`
//!
//! Lower is better for both. The held-out log-likelihood is carried alongside
//! so reports can rank by out-of-sample fit as well.
use crate::hmm::core::params::free_parameter_count;
use serde::{Deserialize, Serialize};

/// Model-comparison figures for one state count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationCriteria {
    pub n_states: usize,
    pub n_params: usize,
    pub train_log_likelihood: f64,
    pub test_log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

impl InformationCriteria {
    /// Compute AIC/BIC for a `n_states`-state Gaussian fit in `dim`
    /// dimensions.
    pub fn compute(
        n_states: usize, dim: usize, n_train: usize, train_log_likelihood: f64,
        test_log_likelihood: f64,
    ) -> Self {
        InformationCriteria::with_parameter_count(
            n_states,
            free_parameter_count(n_states, dim),
            n_train,
            train_log_likelihood,
            test_log_likelihood,
        )
    }

    /// Compute AIC/BIC from an explicit free-parameter count, for models
    /// whose count is not the Gaussian one.
    pub fn with_parameter_count(
        n_states: usize, n_params: usize, n_train: usize, train_log_likelihood: f64,
        test_log_likelihood: f64,
    ) -> Self {
        let p = n_params as f64;
        InformationCriteria {
            n_states,
            n_params,
            train_log_likelihood,
            test_log_likelihood,
            aic: 2.0 * p - 2.0 * train_log_likelihood,
            bic: p * (n_train as f64).ln() - 2.0 * train_log_likelihood,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // AIC/BIC follow their closed forms for K=2, D=1 (p = 1 + 2 + 2 + 2 = 7).
    fn criteria_match_closed_form() {
        let ic = InformationCriteria::compute(2, 1, 100, -150.0, -60.0);

        assert_eq!(ic.n_params, 7);
        assert_relative_eq!(ic.aic, 14.0 + 300.0);
        assert_relative_eq!(ic.bic, 7.0 * 100f64.ln() + 300.0);
        assert_eq!(ic.test_log_likelihood, -60.0);
    }
}
