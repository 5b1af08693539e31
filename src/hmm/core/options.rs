//! HMM options — configuration for EM estimation and decoding.
//!
//! Purpose
//! -------
//! Collect every knob that influences a Gaussian HMM fit in one validated,
//! reproducible value: the EM iteration cap and tolerance, the covariance
//! regularization floor, the RNG seed, the initialization policy, and the
//! decoding algorithm.
//!
//! Key behaviors
//! -------------
//! - [`EmOptions::new`] validates all numeric fields and the nested
//!   [`InitOptions`]; `EmOptions::default()` reproduces the reference
//!   configuration (100 iterations, tol 1e-2, floor 1e-3, seed 42).
//! - [`DecodeAlgorithm`] selects max-posterior (per-step argmax of γ) or
//!   Viterbi (jointly most likely path) decoding.
//!
//! Invariants & assumptions
//! ------------------------
//! - `max_iter > 0`, `tol` finite and `> 0`, `covariance_regularization`
//!   finite and `> 0`.
//! - The same options and the same training data always produce the same
//!   fitted parameters: the only randomness is a `StdRng` seeded from `seed`.
//!
//! Conventions
//! -----------
//! - Convergence is declared when `|ℓ_new − ℓ_old| < tol` on the training
//!   log-likelihood (absolute, not per-observation).
//! - Types derive `serde` so they can be embedded directly in the run
//!   configuration file.
//!
//! Testing notes
//! -------------
//! - Unit tests check defaults and rejection of invalid numeric fields.
use crate::hmm::{
    core::init::InitOptions,
    errors::{HmmError, HmmResult},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default EM iteration cap.
pub const DEFAULT_MAX_ITER: usize = 100;
/// Default absolute log-likelihood tolerance.
pub const DEFAULT_TOL: f64 = 1e-2;
/// Default diagonal covariance floor.
pub const DEFAULT_COVARIANCE_REGULARIZATION: f64 = 1e-3;
/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 42;

/// How hidden states are assigned when decoding a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeAlgorithm {
    /// `label_t = argmax_k γ_t(k)`, ties to the lowest index.
    #[default]
    MaxPosterior,
    /// Most likely joint state path (log-space Viterbi).
    Viterbi,
}

impl std::fmt::Display for DecodeAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeAlgorithm::MaxPosterior => write!(f, "max_posterior"),
            DecodeAlgorithm::Viterbi => write!(f, "viterbi"),
        }
    }
}

impl FromStr for DecodeAlgorithm {
    type Err = HmmError;

    /// Parse a decoding algorithm (case-insensitive; `-` and `_` are
    /// interchangeable). Accepts `max_posterior`/`posterior` and `viterbi`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "max_posterior" | "posterior" => Ok(DecodeAlgorithm::MaxPosterior),
            "viterbi" => Ok(DecodeAlgorithm::Viterbi),
            _ => Err(HmmError::InvalidDecodeAlgorithm { name: s.to_string() }),
        }
    }
}

/// EmOptions — estimation and decoding configuration for a Gaussian HMM.
///
/// Fields
/// ------
/// - `max_iter`: EM iteration cap (> 0).
/// - `tol`: EM stops once the training log-likelihood improves by less
///   than this (> 0); a decrease also stops it.
/// - `covariance_regularization`: diagonal floor added to every
///   re-estimated covariance (> 0).
/// - `seed`: RNG seed for initialization.
/// - `init`: initialization policy.
/// - `decode`: decoding algorithm used by `decode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmOptions {
    pub max_iter: usize,
    pub tol: f64,
    pub covariance_regularization: f64,
    pub seed: u64,
    pub init: InitOptions,
    pub decode: DecodeAlgorithm,
}

impl EmOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - `HmmError::InvalidMaxIter`, `HmmError::InvalidTolerance`,
    ///   `HmmError::InvalidRegularization` for bad numeric fields.
    /// - Any error raised by [`InitOptions::validate`].
    pub fn new(
        max_iter: usize, tol: f64, covariance_regularization: f64, seed: u64, init: InitOptions,
        decode: DecodeAlgorithm,
    ) -> HmmResult<Self> {
        let opts = EmOptions { max_iter, tol, covariance_regularization, seed, init, decode };
        opts.validate()?;
        Ok(opts)
    }

    /// Re-check all invariants (used after deserialization or CLI overrides).
    pub fn validate(&self) -> HmmResult<()> {
        if self.max_iter == 0 {
            return Err(HmmError::InvalidMaxIter { max_iter: self.max_iter });
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(HmmError::InvalidTolerance { tol: self.tol });
        }
        if !(self.covariance_regularization.is_finite() && self.covariance_regularization > 0.0)
        {
            return Err(HmmError::InvalidRegularization { value: self.covariance_regularization });
        }
        self.init.validate()
    }

    /// Copy of `self` with a different seed.
    pub fn with_seed(&self, seed: u64) -> Self {
        EmOptions { seed, ..self.clone() }
    }
}

impl Default for EmOptions {
    fn default() -> Self {
        EmOptions {
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            covariance_regularization: DEFAULT_COVARIANCE_REGULARIZATION,
            seed: DEFAULT_SEED,
            init: InitOptions::default(),
            decode: DecodeAlgorithm::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults reproduce the reference configuration and validate.
    fn defaults_are_valid() {
        let opts = EmOptions::default();

        assert_eq!(opts.max_iter, 100);
        assert_eq!(opts.tol, 1e-2);
        assert_eq!(opts.covariance_regularization, 1e-3);
        assert_eq!(opts.seed, 42);
        assert_eq!(opts.decode, DecodeAlgorithm::MaxPosterior);
        assert!(opts.validate().is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Each invalid numeric field maps to its own error variant.
    fn invalid_fields_are_rejected() {
        let init = InitOptions::default();
        let d = DecodeAlgorithm::Viterbi;

        assert_eq!(
            EmOptions::new(0, 1e-2, 1e-3, 1, init.clone(), d).unwrap_err(),
            HmmError::InvalidMaxIter { max_iter: 0 }
        );
        assert!(matches!(
            EmOptions::new(10, f64::NAN, 1e-3, 1, init.clone(), d),
            Err(HmmError::InvalidTolerance { .. })
        ));
        assert!(matches!(
            EmOptions::new(10, 1e-2, 0.0, 1, init, d),
            Err(HmmError::InvalidRegularization { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Decode algorithms serialize in snake_case for the config file.
    fn decode_algorithm_serializes_snake_case() {
        let json = serde_json::to_string(&DecodeAlgorithm::MaxPosterior).unwrap();
        assert_eq!(json, "\"max_posterior\"");
        assert_eq!(DecodeAlgorithm::Viterbi.to_string(), "viterbi");
    }

    #[test]
    // Purpose
    // -------
    // Parsing is case-insensitive and rejects unknown names.
    fn decode_algorithm_parses_from_str() {
        assert_eq!("Max-Posterior".parse::<DecodeAlgorithm>(), Ok(DecodeAlgorithm::MaxPosterior));
        assert_eq!("VITERBI".parse::<DecodeAlgorithm>(), Ok(DecodeAlgorithm::Viterbi));
        assert!(matches!(
            "beam".parse::<DecodeAlgorithm>(),
            Err(HmmError::InvalidDecodeAlgorithm { .. })
        ));
    }
}
