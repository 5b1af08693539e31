//! Pipeline entry points.
//!
//! Purpose
//! -------
//! Wire the stages of one run together: validate configuration, align
//! panels, split and scale, sweep K, and persist.
//!
//! Key behaviors
//! -------------
//! - [`run_regimes`]: everything up to and including the sweep, with no
//!   filesystem access.
//! - [`run_pipeline`]: [`run_regimes`] followed by persistence through an
//!   [`ArtifactStore`].
//! - [`run_from_files`]: reads both panels from the paths in the
//!   configuration and persists under `output_dir` with a fresh run tag.
//!
//! Invariants & assumptions
//! ------------------------
//! - Configuration, panel, alignment and split/scale failures abort the run
//!   before any model is fitted.
//! - Per-K failures never abort the run; they are reported in
//!   [`SweepReport::failures`].
use crate::{
    config::{ConfigError, RegimeConfig},
    panel::{align_panels, read_panel_csv, AlignedPanel, FeatureLayout, MacroPanel, ReturnsPanel},
    pipeline::errors::PipelineResult,
    preprocessing::{split_and_scale, ScaledSplit},
    sweep::{ArtifactStore, RegimeSweep, RunContext, RunTag, SweepReport},
};
use chrono::NaiveDate;
use ndarray::s;
use std::path::PathBuf;
use tracing::info;

/// In-memory result of a run.
#[derive(Debug, Clone)]
pub struct RegimeRun {
    pub layout: FeatureLayout,
    pub aligned: AlignedPanel,
    pub scaled: ScaledSplit,
    pub report: SweepReport,
}

impl RegimeRun {
    /// Dates of the decoded (test) months.
    pub fn test_dates(&self) -> &[NaiveDate] {
        &self.aligned.dates[self.scaled.split.test_range()]
    }

    pub fn run_context(&self) -> RunContext<'_> {
        RunContext {
            test_dates: self.test_dates(),
            layout: &self.layout,
            scaler: &self.scaled.scaler,
            split: self.scaled.split,
        }
    }
}

/// A run together with the artifacts written for it.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: RunTag,
    pub result: RegimeRun,
    pub written: Vec<PathBuf>,
}

/// Align, split, scale and sweep without touching the filesystem.
///
/// Parameters
/// ----------
/// - `config`: `&RegimeConfig`
///   Validated here before anything else.
/// - `macro_panel`: `&MacroPanel`
///   Monthly macro indicators.
/// - `returns_panel`: `&ReturnsPanel`
///   Monthly sector returns.
///
/// Errors
/// ------
/// - `PipelineError::Configuration`, `Alignment`, `Preprocessing`.
pub fn run_regimes(
    config: &RegimeConfig, macro_panel: &MacroPanel, returns_panel: &ReturnsPanel,
) -> PipelineResult<RegimeRun> {
    config.validate()?;
    let opts = config.em_options()?;
    let layout = config.feature_layout();

    let aligned = align_panels(macro_panel, returns_panel, &layout, &config.align_options())?;

    let scaled = split_and_scale(aligned.features.view(), config.split_fraction)?;
    let test_returns = aligned.returns.slice(s![scaled.split.test_range(), ..]);

    let (k_min, k_max) = config.regime_count_range;
    let sweep = RegimeSweep {
        k_min,
        k_max,
        opts,
        parallel: config.parallel,
        periods_per_year: config.periods_per_year,
    };
    let report =
        sweep.run(scaled.train.view(), scaled.test.view(), test_returns, &aligned.return_columns);
    info!(
        succeeded = report.successes.len(),
        failed = report.failures.len(),
        "regime sweep finished"
    );

    Ok(RegimeRun { layout, aligned, scaled, report })
}

/// [`run_regimes`] followed by persistence into `store`.
///
/// # Errors
/// - Any error of [`run_regimes`].
/// - `PipelineError::Persistence` if an artifact cannot be written.
pub fn run_pipeline(
    config: &RegimeConfig, macro_panel: &MacroPanel, returns_panel: &ReturnsPanel,
    store: &ArtifactStore,
) -> PipelineResult<RunOutcome> {
    let result = run_regimes(config, macro_panel, returns_panel)?;
    let written = store.persist_sweep(&result.report, &result.run_context())?;
    Ok(RunOutcome { run: store.run().clone(), result, written })
}

/// Load both panels from the configured paths and run the full pipeline,
/// writing artifacts under `config.output_dir` tagged with the current time.
///
/// # Errors
/// - `PipelineError::Configuration` if a panel path is missing.
/// - `PipelineError::Panel` if a panel cannot be read.
/// - Any error of [`run_pipeline`].
pub fn run_from_files(config: &RegimeConfig) -> PipelineResult<RunOutcome> {
    config.validate()?;
    let macro_path = config
        .macro_panel_path
        .as_ref()
        .ok_or(ConfigError::MissingPath { field: "macro_panel_path" })?;
    let returns_path = config
        .returns_panel_path
        .as_ref()
        .ok_or(ConfigError::MissingPath { field: "returns_panel_path" })?;

    let macro_panel = read_panel_csv(macro_path)?;
    let returns_panel = read_panel_csv(returns_path)?;
    info!(
        macro_rows = macro_panel.len(),
        returns_rows = returns_panel.len(),
        "panels loaded"
    );

    let store = ArtifactStore::create(&config.output_dir, RunTag::now())?;
    run_pipeline(config, &macro_panel, &returns_panel, &store)
}
