//! models — Gaussian HMM estimation, decoding and model comparison.
//!
//! Purpose
//! -------
//! Expose the user-facing sequence-model API built on `hmm::core`:
//! the [`SequenceModel`] seam, the [`GaussianHmm`] EM estimator, the
//! [`decode`] entry point, the log-space recursions in [`inference`], and
//! [`InformationCriteria`] for comparing state counts.
//!
//! Downstream usage
//! ----------------
//! - The sweep controller constructs one [`GaussianHmm`] per candidate K,
//!   calls `fit` on the scaled training matrix and `decode` on the scaled
//!   test matrix, and records [`InformationCriteria`] per K.

pub mod decoder;
pub mod gaussian_hmm;
pub mod inference;
pub mod selection;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::decoder::{decode, RegimeDecoding};
pub use self::gaussian_hmm::{GaussianHmm, MIN_STATE_WEIGHT};
pub use self::inference::{forward_backward, ForwardBackward};
pub use self::selection::InformationCriteria;
pub use self::traits::{FitOutcome, SequenceModel};
