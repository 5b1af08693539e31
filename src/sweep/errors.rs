//! Errors for the regime sweep and its persistence boundary.
//!
//! - [`PersistError`]: failures writing artifacts to disk.
//! - [`FailureStage`]: which per-K stage failed; carried by
//!   [`KFailure`](crate::sweep::controller::KFailure) so one bad state count
//!   never aborts the sweep.
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Result alias for artifact persistence.
pub type PersistResult<T> = Result<T, PersistError>;

/// Artifact persistence failures.
#[derive(Debug, Error)]
pub enum PersistError {
    // ---- Filesystem ----
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to overwrite existing artifact {path}")]
    AlreadyExists { path: PathBuf },

    #[error("Run tag {run} already has artifacts in the output directory ({path})")]
    RunTagInUse { run: String, path: PathBuf },

    // ---- Encoding ----
    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error writing {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ---- Inputs ----
    #[error("Artifact for K={n_states} has {labels} labels but {dates} dates")]
    LengthMismatch { n_states: usize, labels: usize, dates: usize },
}

/// Per-K stage at which a sweep unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Building the model (invalid K or options).
    Setup,
    /// EM estimation on the training window.
    Fit,
    /// Decoding the test window.
    Decode,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Setup => "setup",
            FailureStage::Fit => "fit",
            FailureStage::Decode => "decode",
        };
        f.write_str(name)
    }
}
