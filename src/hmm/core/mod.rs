//! core — Gaussian HMM parameters, emissions, initialization, and options.
//!
//! Purpose
//! -------
//! Collect the building blocks shared by the estimator and decoder in
//! `hmm::models`: log-space helpers, full-covariance Gaussian emissions with
//! covariance conditioning, the validated parameter container, seeded
//! initialization policies, and estimation/decoding options.
//!
//! Key behaviors
//! -------------
//! - [`GaussianEmission`] caches a Cholesky factor and exposes `log_pdf`;
//!   [`condition_covariance`] is the single regularization path.
//! - [`HmmParams`] validates π, A and the emission list; [`HmmParamsSnapshot`]
//!   is its serde form.
//! - [`initial_params`] builds θ⁰ from data and a seeded RNG according to
//!   [`InitOptions`].
//! - [`EmOptions`] carries every estimation/decoding knob.
//!
//! Invariants & assumptions
//! ------------------------
//! - Probability vectors and transition rows sum to one within
//!   [`NORMALIZATION_TOL`].
//! - Every stored covariance is symmetric positive-definite.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; observations are `T×D` row-major `ndarray`s.
//! - This module performs no I/O and no logging.

pub mod emission;
pub mod init;
pub mod logspace;
pub mod options;
pub mod params;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::emission::{condition_covariance, GaussianEmission, MAX_REGULARIZATION_ATTEMPTS};
pub use self::init::{
    initial_params, InitOptions, MeansInit, StartInit, TransitionInit, DEFAULT_KMEANS_ITERATIONS,
    DEFAULT_SELF_TRANSITION,
};
pub use self::logspace::{log_sum_exp, LOG_2PI, NORMALIZATION_TOL};
pub use self::options::{DecodeAlgorithm, EmOptions};
pub use self::params::{free_parameter_count, HmmParams, HmmParamsSnapshot};
pub use self::validation::{validate_fit_inputs, validate_observations};

pub mod prelude {
    pub use super::emission::GaussianEmission;
    pub use super::init::{InitOptions, MeansInit, StartInit, TransitionInit};
    pub use super::options::{DecodeAlgorithm, EmOptions};
    pub use super::params::{HmmParams, HmmParamsSnapshot};
}
