//! macro_regimes — Gaussian HMM regime inference over monthly macro panels.
//!
//! Purpose
//! -------
//! Serve as the crate root for the regime-inference batch engine: infer
//! latent market regimes from a panel of macroeconomic indicators with a
//! full-covariance Gaussian hidden Markov model, and summarize sector returns
//! under each inferred regime.
//!
//! Key behaviors
//! -------------
//! - [`panel`]: CSV ingestion, derived features (rate spread, year-over-year
//!   changes), month-end alignment of the macro and returns panels, and gap
//!   filling.
//! - [`preprocessing`]: chronological train/test split and train-only
//!   standardization.
//! - [`hmm`]: log-space Baum–Welch estimation, covariance conditioning,
//!   max-posterior and Viterbi decoding, information criteria.
//! - [`sweep`]: per-K fit-and-decode over a range of state counts (serial or
//!   `rayon`-parallel), per-regime performance summaries, run-tagged artifact
//!   persistence.
//! - [`config`] / [`pipeline`]: explicit run configuration and the batch
//!   entry points used by the `macro-regimes` binary.
//!
//! Invariants & assumptions
//! ------------------------
//! - No statistic of the test window reaches the scaler or the fitted model.
//! - Fitted start distributions and transition rows sum to one; every
//!   emission covariance is symmetric positive-definite.
//! - Runs are deterministic for identical inputs and `random_seed`.
//!
//! Conventions
//! -----------
//! - Observations are `T×D` `ndarray` matrices, one row per month.
//! - State indices are 0-based; decoding ties resolve to the lowest index.
//! - Each domain module owns a `thiserror` error enum; the pipeline wraps
//!   fatal ones in a stage-tagged [`pipeline::PipelineError`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code they cover; `tests/` drives the full
//!   pipeline on synthetic panels.

pub mod config;
pub mod hmm;
pub mod panel;
pub mod pipeline;
pub mod preprocessing;
pub mod sweep;
