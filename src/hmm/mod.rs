//! hmm — Gaussian hidden Markov models: core numerics, models, and errors.
//!
//! Purpose
//! -------
//! Provide the statistical engine of the regime pipeline: a K-state hidden
//! Markov model with full-covariance Gaussian emissions, estimated by
//! Baum–Welch EM and decoded by max-posterior or Viterbi.
//!
//! Key behaviors
//! -------------
//! - [`core`]: log-space helpers, Gaussian emissions with covariance
//!   conditioning, validated parameters, seeded initialization, and options.
//! - [`models`]: the [`SequenceModel`] trait, the [`GaussianHmm`] estimator,
//!   decoding, forward–backward/Viterbi recursions, and information criteria.
//! - [`errors`]: [`HmmError`], the [`HmmResult`] alias and the non-fatal
//!   [`ConvergenceWarning`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Observations are finite `T×D` matrices; the pipeline standardizes them
//!   before they reach this layer.
//! - Fits are deterministic given data and [`EmOptions`].
//!
//! Conventions
//! -----------
//! - The only logging in this layer is the EM progress emitted by
//!   [`GaussianHmm`]; everything else is pure computation.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    DecodeAlgorithm, EmOptions, GaussianEmission, HmmParams, HmmParamsSnapshot, InitOptions,
    MeansInit, StartInit, TransitionInit,
};
pub use self::errors::{ConvergenceWarning, HmmError, HmmResult};
pub use self::models::{
    decode, FitOutcome, GaussianHmm, InformationCriteria, RegimeDecoding, SequenceModel,
};

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::errors::{ConvergenceWarning, HmmError, HmmResult};
    pub use super::models::{
        FitOutcome, GaussianHmm, InformationCriteria, RegimeDecoding, SequenceModel,
    };
}
