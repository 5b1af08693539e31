//! Sweep controller — fit and decode across a range of state counts.
//!
//! Purpose
//! -------
//! Run the estimator and decoder once per candidate K over shared read-only
//! training/test matrices and collect the results, isolating failures so one
//! bad K never aborts the others.
//!
//! Key behaviors
//! -------------
//! - [`fit_and_decode`] is a pure function of `(train, test, K, options)`;
//!   it performs no I/O and touches no returns data.
//! - [`RegimeSweep::run`] evaluates every K in `k_min..=k_max`, in parallel
//!   with `rayon` or serially, then joins each decoding with the test-window
//!   returns via [`summarize_performance`].
//! - [`RegimeSweep::run_with`] does the same for any [`SequenceModel`] built
//!   per K by a caller-supplied constructor.
//! - Results are ordered by K regardless of execution mode; serial and
//!   parallel sweeps produce identical reports.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every K is fitted with the same seed, so a K's result does not depend on
//!   which other K values are swept.
//! - `test_returns` has one row per test observation.
//!
//! Conventions
//! -----------
//! - Per-K failures are returned as [`KFailure`] values in the
//!   [`SweepReport`] and logged at `warn`.
use crate::{
    hmm::{
        EmOptions, GaussianHmm, HmmError, HmmParams, HmmResult, InformationCriteria,
        SequenceModel,
    },
    sweep::{
        artifacts::{RegimeArtifacts, SweepEntry},
        errors::FailureStage,
        summary::summarize_performance,
    },
};
use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::{info, warn};

/// A state count whose fit or decode failed.
#[derive(Debug, Clone, PartialEq)]
pub struct KFailure {
    pub k: usize,
    pub stage: FailureStage,
    pub error: HmmError,
}

/// Outcome of a sweep: successes and failures, each sorted by K.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepReport {
    pub successes: Vec<SweepEntry>,
    pub failures: Vec<KFailure>,
}

impl SweepReport {
    /// Successful entry for `k`, if any.
    pub fn entry(&self, k: usize) -> Option<&SweepEntry> {
        self.successes.iter().find(|e| e.artifacts.n_states == k)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fit a `K`-state Gaussian HMM on `train` and decode `test`.
///
/// Parameters
/// ----------
/// - `train`, `test`: `ArrayView2<f64>`
///   Scaled `T×D` matrices with the same `D`.
/// - `n_states`: `usize`
///   Number of regimes K.
/// - `opts`: `&EmOptions`
///   Estimation options, including the seed and decode algorithm.
///
/// Errors
/// ------
/// - `KFailure` tagged with the stage that failed.
pub fn fit_and_decode(
    train: ArrayView2<f64>, test: ArrayView2<f64>, n_states: usize, opts: &EmOptions,
) -> Result<RegimeArtifacts, KFailure> {
    let model = GaussianHmm::new(n_states, opts.clone())
        .map_err(|error| KFailure { k: n_states, stage: FailureStage::Setup, error })?;
    fit_and_decode_with(&model, train, test)
}

/// [`fit_and_decode`] for any [`SequenceModel`].
pub fn fit_and_decode_with<M: SequenceModel>(
    model: &M, train: ArrayView2<f64>, test: ArrayView2<f64>,
) -> Result<RegimeArtifacts<M::Params>, KFailure> {
    let k = model.n_states();
    let fit = model.fit(train).map_err(|error| KFailure { k, stage: FailureStage::Fit, error })?;
    let decoding = model
        .decode(&fit.params, test)
        .map_err(|error| KFailure { k, stage: FailureStage::Decode, error })?;
    let criteria = InformationCriteria::with_parameter_count(
        k,
        model.free_parameters(&fit.params),
        train.nrows(),
        fit.log_likelihood,
        decoding.log_likelihood,
    );
    Ok(RegimeArtifacts { n_states: k, fit, decoding, criteria })
}

/// Sweep over an inclusive range of state counts.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeSweep {
    pub k_min: usize,
    pub k_max: usize,
    pub opts: EmOptions,
    pub parallel: bool,
    pub periods_per_year: f64,
}

impl RegimeSweep {
    pub fn state_counts(&self) -> Vec<usize> {
        (self.k_min..=self.k_max).collect()
    }

    /// Fit and decode every K, then summarize test-window returns by regime.
    ///
    /// Parameters
    /// ----------
    /// - `train`, `test`: `ArrayView2<f64>`
    ///   Scaled feature matrices.
    /// - `test_returns`: `ArrayView2<f64>`
    ///   Returns aligned with the rows of `test`.
    /// - `return_columns`: `&[String]`
    ///
    /// Returns
    /// -------
    /// `SweepReport` with one success or failure per K, sorted by K.
    pub fn run(
        &self, train: ArrayView2<f64>, test: ArrayView2<f64>, test_returns: ArrayView2<f64>,
        return_columns: &[String],
    ) -> SweepReport {
        let opts = &self.opts;
        self.run_with(
            |k| GaussianHmm::new(k, opts.clone()),
            train,
            test,
            test_returns,
            return_columns,
        )
    }

    /// [`RegimeSweep::run`] with the model for each K built by `build`.
    ///
    /// A `build` error is reported as a [`FailureStage::Setup`] failure for
    /// that K.
    pub fn run_with<M, F>(
        &self, build: F, train: ArrayView2<f64>, test: ArrayView2<f64>,
        test_returns: ArrayView2<f64>, return_columns: &[String],
    ) -> SweepReport
    where
        M: SequenceModel<Params = HmmParams>,
        F: Fn(usize) -> HmmResult<M> + Sync + Send,
    {
        let unit = |k: usize| {
            let model = build(k)
                .map_err(|error| KFailure { k, stage: FailureStage::Setup, error })?;
            fit_and_decode_with(&model, train, test)
        };
        let results: Vec<Result<RegimeArtifacts, KFailure>> = if self.parallel {
            (self.k_min..=self.k_max).into_par_iter().map(unit).collect()
        } else {
            (self.k_min..=self.k_max).map(unit).collect()
        };

        let mut report = SweepReport::default();
        for result in results {
            match result {
                Ok(artifacts) => {
                    info!(
                        k = artifacts.n_states,
                        iterations = artifacts.fit.iterations,
                        converged = artifacts.fit.converged,
                        train_ll = artifacts.criteria.train_log_likelihood,
                        test_ll = artifacts.criteria.test_log_likelihood,
                        bic = artifacts.criteria.bic,
                        "regime model fitted"
                    );
                    let performance = summarize_performance(
                        &artifacts.decoding.labels,
                        artifacts.n_states,
                        test_returns,
                        return_columns,
                        self.periods_per_year,
                    );
                    report.successes.push(SweepEntry { artifacts, performance });
                }
                Err(failure) => {
                    warn!(
                        k = failure.k,
                        stage = %failure.stage,
                        error = %failure.error,
                        "regime model failed; continuing sweep"
                    );
                    report.failures.push(failure);
                }
            }
        }
        report
    }
}
