//! Persistence boundary — run-tagged artifact files.
//!
//! Purpose
//! -------
//! Write the results of a sweep to disk. All file naming and tagging lives
//! here; the controller and the model layer never touch the filesystem.
//!
//! Key behaviors
//! -------------
//! Under the store's root directory, per fitted K:
//! - `regimes_k{K}_{RUN}.csv`: `Date,Regime`.
//! - `probabilities_k{K}_{RUN}.csv`: `Date,Regime_0,…,Regime_{K−1}`.
//! - `performance_k{K}_{RUN}.csv`: one row per (regime, column).
//! - `model_k{K}_{RUN}.json`: parameters, scaler, feature layout,
//!   diagnostics and convergence warning.
//!
//! and once per sweep `sweep_summary_{RUN}.csv` with one row per K,
//! including failed K values.
//!
//! Invariants & assumptions
//! ------------------------
//! - `RUN` is the UTC run timestamp `%Y%m%d_%H%M%S`.
//! - Files are opened with create-new semantics; an existing artifact is
//!   never overwritten ([`PersistError::AlreadyExists`]).
//! - [`ArtifactStore::create`] refuses a run tag that already has artifacts
//!   under the root ([`PersistError::RunTagInUse`]), so a tag collision is
//!   reported before any model is fitted.
//! - Buffered writers are flushed explicitly and flush errors are returned.
use crate::{
    hmm::{ConvergenceWarning, DecodeAlgorithm, HmmParamsSnapshot, InformationCriteria},
    panel::FeatureLayout,
    preprocessing::{ChronoSplit, ScalerParams},
    sweep::{
        artifacts::SweepEntry,
        controller::SweepReport,
        errors::{PersistError, PersistResult},
    },
};
use chrono::{NaiveDate, Utc};
use csv::Writer;
use serde::Serialize;
use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io::{BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::info;

/// Timestamp tag shared by every artifact of one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunTag(String);

impl RunTag {
    /// Tag for the current UTC time.
    pub fn now() -> Self {
        RunTag(Utc::now().format("%Y%m%d_%H%M%S").to_string())
    }

    /// Use an explicit tag.
    pub fn new(tag: impl Into<String>) -> Self {
        RunTag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run-level context recorded next to each model.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    /// Dates of the test window, one per decoded label.
    pub test_dates: &'a [NaiveDate],
    pub layout: &'a FeatureLayout,
    pub scaler: &'a ScalerParams,
    pub split: ChronoSplit,
}

#[derive(Debug, Serialize)]
struct ScalerRecord<'a> {
    mean: Vec<f64>,
    std: Vec<f64>,
    feature_names: &'a [String],
}

#[derive(Debug, Serialize)]
struct ModelRecord<'a> {
    run: &'a str,
    n_states: usize,
    decode_algorithm: DecodeAlgorithm,
    iterations: usize,
    converged: bool,
    warning: Option<&'a ConvergenceWarning>,
    criteria: &'a InformationCriteria,
    log_likelihood_history: &'a [f64],
    train_rows: usize,
    test_rows: usize,
    test_start: Option<NaiveDate>,
    test_end: Option<NaiveDate>,
    layout: &'a FeatureLayout,
    scaler: ScalerRecord<'a>,
    params: HmmParamsSnapshot,
}

/// Writes run-tagged artifacts below a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    run: RunTag,
}

impl ArtifactStore {
    /// Create the store, creating `root` if needed.
    ///
    /// # Errors
    /// - `PersistError::Io` if the directory cannot be created or listed.
    /// - `PersistError::RunTagInUse` if a file tagged with `run` already
    ///   exists under `root`.
    pub fn create(root: impl Into<PathBuf>, run: RunTag) -> PersistResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|source| PersistError::Io { path: root.clone(), source })?;
        let store = ArtifactStore { root, run };
        if let Some(path) = store.existing_artifact()? {
            return Err(PersistError::RunTagInUse { run: store.run.to_string(), path });
        }
        Ok(store)
    }

    /// First file under the root carrying this store's run tag.
    fn existing_artifact(&self) -> PersistResult<Option<PathBuf>> {
        let io_err =
            |source: std::io::Error| PersistError::Io { path: self.root.clone(), source };
        let suffixes = [format!("_{}.csv", self.run), format!("_{}.json", self.run)];
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let tagged = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| suffixes.iter().any(|s| name.ends_with(s.as_str())));
            if tagged {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run(&self) -> &RunTag {
        &self.run
    }

    /// Path of the `{stem}_k{K}_{RUN}.{ext}` artifact.
    pub fn artifact_path(&self, stem: &str, k: usize, ext: &str) -> PathBuf {
        self.root.join(format!("{stem}_k{k}_{}.{ext}", self.run))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(format!("sweep_summary_{}.csv", self.run))
    }

    /// Write every artifact of `report` and return the created paths.
    ///
    /// # Errors
    /// - Any [`PersistError`]; writing stops at the first failure.
    pub fn persist_sweep(
        &self, report: &SweepReport, ctx: &RunContext<'_>,
    ) -> PersistResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for entry in &report.successes {
            written.extend(self.persist_entry(entry, ctx)?);
        }
        written.push(self.write_summary(report)?);
        info!(
            run = %self.run,
            files = written.len(),
            dir = %self.root.display(),
            "artifacts written"
        );
        Ok(written)
    }

    /// Write the four per-K artifacts of one entry.
    pub fn persist_entry(
        &self, entry: &SweepEntry, ctx: &RunContext<'_>,
    ) -> PersistResult<Vec<PathBuf>> {
        let k = entry.artifacts.n_states;
        let labels = &entry.artifacts.decoding.labels;
        if labels.len() != ctx.test_dates.len() {
            return Err(PersistError::LengthMismatch {
                n_states: k,
                labels: labels.len(),
                dates: ctx.test_dates.len(),
            });
        }
        Ok(vec![
            self.write_regimes(entry, ctx.test_dates)?,
            self.write_probabilities(entry, ctx.test_dates)?,
            self.write_performance(entry)?,
            self.write_model(entry, ctx)?,
        ])
    }

    fn write_regimes(&self, entry: &SweepEntry, dates: &[NaiveDate]) -> PersistResult<PathBuf> {
        let path = self.artifact_path("regimes", entry.artifacts.n_states, "csv");
        let mut wtr = csv_writer(&path)?;
        let csv_err = |source: csv::Error| PersistError::Csv { path: path.clone(), source };
        wtr.write_record(["Date", "Regime"]).map_err(csv_err)?;
        for (date, label) in dates.iter().zip(&entry.artifacts.decoding.labels) {
            wtr.write_record([date.to_string(), label.to_string()]).map_err(csv_err)?;
        }
        flush(wtr, &path)?;
        Ok(path)
    }

    fn write_probabilities(
        &self, entry: &SweepEntry, dates: &[NaiveDate],
    ) -> PersistResult<PathBuf> {
        let k = entry.artifacts.n_states;
        let path = self.artifact_path("probabilities", k, "csv");
        let mut wtr = csv_writer(&path)?;
        let csv_err = |source: csv::Error| PersistError::Csv { path: path.clone(), source };
        let mut header = vec!["Date".to_string()];
        header.extend((0..k).map(|r| format!("Regime_{r}")));
        wtr.write_record(&header).map_err(csv_err)?;
        for (date, row) in dates.iter().zip(entry.artifacts.decoding.posteriors.outer_iter()) {
            let mut record = vec![date.to_string()];
            record.extend(row.iter().map(f64::to_string));
            wtr.write_record(&record).map_err(csv_err)?;
        }
        flush(wtr, &path)?;
        Ok(path)
    }

    fn write_performance(&self, entry: &SweepEntry) -> PersistResult<PathBuf> {
        let path = self.artifact_path("performance", entry.artifacts.n_states, "csv");
        let mut wtr = csv_writer(&path)?;
        let csv_err = |source: csv::Error| PersistError::Csv { path: path.clone(), source };
        wtr.write_record(["Regime", "Count", "Column", "Observations", "Mean", "Std", "Sharpe"])
            .map_err(csv_err)?;
        for regime in &entry.performance.regimes {
            for stats in &regime.columns {
                wtr.write_record([
                    regime.regime.to_string(),
                    regime.count.to_string(),
                    stats.column.clone(),
                    stats.observations.to_string(),
                    opt_to_string(stats.mean),
                    opt_to_string(stats.std),
                    opt_to_string(stats.sharpe),
                ])
                .map_err(csv_err)?;
            }
        }
        flush(wtr, &path)?;
        Ok(path)
    }

    fn write_model(&self, entry: &SweepEntry, ctx: &RunContext<'_>) -> PersistResult<PathBuf> {
        let a = &entry.artifacts;
        let path = self.artifact_path("model", a.n_states, "json");
        let feature_names = ctx.layout.names();
        let record = ModelRecord {
            run: self.run.as_str(),
            n_states: a.n_states,
            decode_algorithm: a.decoding.algorithm,
            iterations: a.fit.iterations,
            converged: a.fit.converged,
            warning: a.fit.warning.as_ref(),
            criteria: &a.criteria,
            log_likelihood_history: &a.fit.history,
            train_rows: ctx.split.train_len(),
            test_rows: ctx.split.test_len(),
            test_start: ctx.test_dates.first().copied(),
            test_end: ctx.test_dates.last().copied(),
            layout: ctx.layout,
            scaler: ScalerRecord {
                mean: ctx.scaler.mean().to_vec(),
                std: ctx.scaler.std().to_vec(),
                feature_names: &feature_names,
            },
            params: a.fit.params.to_snapshot(),
        };
        write_json(create_new(&path)?, &record, &path)?;
        Ok(path)
    }

    /// Write the sweep-level table: one row per K, failures included.
    pub fn write_summary(&self, report: &SweepReport) -> PersistResult<PathBuf> {
        let path = self.summary_path();
        let mut wtr = csv_writer(&path)?;
        let csv_err = |source: csv::Error| PersistError::Csv { path: path.clone(), source };
        wtr.write_record([
            "K",
            "Status",
            "Stage",
            "Iterations",
            "Converged",
            "TrainLogLikelihood",
            "TestLogLikelihood",
            "NParams",
            "AIC",
            "BIC",
            "Message",
        ])
        .map_err(csv_err)?;

        let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
        for entry in &report.successes {
            let a = &entry.artifacts;
            let c = &a.criteria;
            let message = a.fit.warning.as_ref().map(ToString::to_string).unwrap_or_default();
            rows.push((
                a.n_states,
                vec![
                    a.n_states.to_string(),
                    "ok".to_string(),
                    String::new(),
                    a.fit.iterations.to_string(),
                    a.fit.converged.to_string(),
                    c.train_log_likelihood.to_string(),
                    c.test_log_likelihood.to_string(),
                    c.n_params.to_string(),
                    c.aic.to_string(),
                    c.bic.to_string(),
                    message,
                ],
            ));
        }
        for failure in &report.failures {
            let mut row = vec![failure.k.to_string(), "failed".to_string()];
            row.push(failure.stage.to_string());
            row.extend(std::iter::repeat(String::new()).take(7));
            row.push(failure.error.to_string());
            rows.push((failure.k, row));
        }
        rows.sort_by_key(|(k, _)| *k);
        for (_, row) in rows {
            wtr.write_record(&row).map_err(csv_err)?;
        }
        flush(wtr, &path)?;
        Ok(path)
    }
}

fn create_new(path: &Path) -> PersistResult<File> {
    OpenOptions::new().write(true).create_new(true).open(path).map_err(|source| {
        if source.kind() == ErrorKind::AlreadyExists {
            PersistError::AlreadyExists { path: path.to_path_buf() }
        } else {
            PersistError::Io { path: path.to_path_buf(), source }
        }
    })
}

fn csv_writer(path: &Path) -> PersistResult<Writer<File>> {
    Ok(Writer::from_writer(create_new(path)?))
}

fn flush(mut wtr: Writer<File>, path: &Path) -> PersistResult<()> {
    wtr.flush().map_err(|source| PersistError::Io { path: path.to_path_buf(), source })
}

/// Serialize `value` as pretty JSON through a buffer and flush it, so a
/// failed final write is reported instead of dropped.
fn write_json<W: Write, T: Serialize>(inner: W, value: &T, path: &Path) -> PersistResult<()> {
    let mut writer = BufWriter::new(inner);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|source| PersistError::Json { path: path.to_path_buf(), source })?;
    writer.flush().map_err(|source| PersistError::Io { path: path.to_path_buf(), source })
}

fn opt_to_string(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hmm::EmOptions,
        panel::DerivedFeatures,
        sweep::{controller::RegimeSweep, errors::FailureStage},
    };
    use ndarray::{array, Array2};

    fn fixture() -> (SweepReport, Vec<NaiveDate>, FeatureLayout, ScalerParams) {
        let train = array![[-1.0], [-1.1], [1.0], [1.2], [-0.9], [1.1], [-1.0], [0.9]];
        let test = array![[-1.0], [1.0], [1.1]];
        let returns = array![[0.01, 0.02], [f64::NAN, 0.01], [0.03, -0.01]];
        let cols = vec!["Tech".to_string(), "Energy".to_string()];
        let sweep = RegimeSweep {
            k_min: 1,
            k_max: 2,
            opts: EmOptions::default(),
            parallel: false,
            periods_per_year: 12.0,
        };
        let report = sweep.run(train.view(), test.view(), returns.view(), &cols);
        let dates = (1..=3).map(|m| NaiveDate::from_ymd_opt(2020, m, 28).unwrap()).collect();
        let layout = FeatureLayout::new(vec!["CPI".to_string()], DerivedFeatures::none());
        let scaler = ScalerParams::fit(Array2::from_elem((2, 1), 1.0).view()).unwrap();
        (report, dates, layout, scaler)
    }

    #[test]
    // Purpose
    // -------
    // A sweep writes four files per K plus one summary, all tagged with K and
    // the run tag, and a second write with the same tag is refused.
    fn writes_tagged_artifacts_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let (report, dates, layout, scaler) = fixture();
        let ctx = RunContext {
            test_dates: &dates,
            layout: &layout,
            scaler: &scaler,
            split: ChronoSplit { train_end: 8, n_rows: 11 },
        };
        let store = ArtifactStore::create(dir.path(), RunTag::new("20240131_120000")).unwrap();

        let written = store.persist_sweep(&report, &ctx).unwrap();

        assert_eq!(written.len(), 2 * 4 + 1);
        let regimes =
            fs::read_to_string(dir.path().join("regimes_k2_20240131_120000.csv")).unwrap();
        let mut lines = regimes.lines();
        assert_eq!(lines.next(), Some("Date,Regime"));
        assert!(lines.next().unwrap().starts_with("2020-01-28,"));
        let probs =
            fs::read_to_string(dir.path().join("probabilities_k2_20240131_120000.csv")).unwrap();
        assert_eq!(probs.lines().next(), Some("Date,Regime_0,Regime_1"));

        let model: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("model_k2_20240131_120000.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(model["n_states"], 2);
        assert_eq!(model["decode_algorithm"], "max_posterior");
        assert_eq!(model["params"]["transmat"].as_array().unwrap().len(), 2);

        let again = store.persist_sweep(&report, &ctx).unwrap_err();
        assert!(matches!(again, PersistError::AlreadyExists { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Failed K values appear in the summary table with their stage.
    fn summary_lists_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (mut report, ..) = fixture();
        report.failures.push(crate::sweep::controller::KFailure {
            k: 3,
            stage: FailureStage::Fit,
            error: crate::hmm::HmmError::EmptySequence,
        });
        let store = ArtifactStore::create(dir.path(), RunTag::new("run")).unwrap();

        let path = store.write_summary(&report).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows.len(), 4);
        assert!(rows[1].starts_with("1,ok,"));
        assert!(rows[3].starts_with("3,failed,fit,"));
    }

    #[test]
    // Purpose
    // -------
    // A store cannot be opened on a run tag that already has artifacts, so
    // a same-second rerun fails before any fitting; other tags are fine.
    fn reused_run_tag_is_rejected_at_creation() {
        let dir = tempfile::tempdir().unwrap();
        let (report, ..) = fixture();
        let store = ArtifactStore::create(dir.path(), RunTag::new("20240131_120000")).unwrap();
        let summary = store.write_summary(&report).unwrap();

        let err = ArtifactStore::create(dir.path(), RunTag::new("20240131_120000")).unwrap_err();

        match err {
            PersistError::RunTagInUse { run, path } => {
                assert_eq!(run, "20240131_120000");
                assert_eq!(path, summary);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ArtifactStore::create(dir.path(), RunTag::new("20240131_120001")).is_ok());
    }

    /// Accepts writes into memory and fails every flush to its sink.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // A JSON record small enough to sit in the buffer still reports the
    // failed write to the underlying sink.
    fn json_write_failure_is_reported() {
        let path = Path::new("model_k2_run.json");

        let err = write_json(FullDisk, &serde_json::json!({ "n_states": 2 }), path).unwrap_err();

        match err {
            PersistError::Io { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.to_string(), "no space left on device");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
