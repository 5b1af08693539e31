//! pipeline — run entry points, stage-tagged errors and logging setup.
//!
//! - [`run_regimes`] / [`run_pipeline`] / [`run_from_files`]: one batch run
//!   from panels (or panel files) to persisted artifacts.
//! - [`PipelineError`]: fatal failures tagged by stage.
//! - [`init_tracing`]: subscriber setup for the binary.

pub mod errors;
pub mod logging;
pub mod run;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{PipelineError, PipelineResult};
pub use self::logging::init_tracing;
pub use self::run::{run_from_files, run_pipeline, run_regimes, RegimeRun, RunOutcome};
