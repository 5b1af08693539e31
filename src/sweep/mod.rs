//! sweep — multi-K regime sweep, performance summary and artifact persistence.
//!
//! Purpose
//! -------
//! Drive the sequence model across a range of state counts and hand the
//! results to the persistence boundary.
//!
//! Key behaviors
//! -------------
//! - [`fit_and_decode`]: pure per-K unit of work returning
//!   [`RegimeArtifacts`].
//! - [`RegimeSweep`]: serial or `rayon`-parallel sweep producing a
//!   [`SweepReport`] with per-K failures isolated as [`KFailure`] values.
//! - [`summarize_performance`]: per-regime return statistics on the test
//!   window.
//! - [`ArtifactStore`]: run-tagged CSV/JSON artifacts with create-new
//!   semantics.
//!
//! Downstream usage
//! ----------------
//! - `pipeline::run_pipeline` builds a `RegimeSweep` from the run
//!   configuration and persists the report through an `ArtifactStore`.

pub mod artifacts;
pub mod controller;
pub mod errors;
pub mod persist;
pub mod summary;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::artifacts::{RegimeArtifacts, SweepEntry};
pub use self::controller::{
    fit_and_decode, fit_and_decode_with, KFailure, RegimeSweep, SweepReport,
};
pub use self::errors::{FailureStage, PersistError, PersistResult};
pub use self::persist::{ArtifactStore, RunContext, RunTag};
pub use self::summary::{
    summarize_performance, ColumnStats, PerformanceSummary, RegimePerformance, EQUAL_WEIGHT_COLUMN,
};

pub mod prelude {
    pub use super::controller::{fit_and_decode, KFailure, RegimeSweep, SweepReport};
    pub use super::persist::{ArtifactStore, RunTag};
    pub use super::summary::PerformanceSummary;
}
