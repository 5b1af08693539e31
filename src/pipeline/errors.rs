//! Top-level, stage-tagged pipeline errors.
//!
//! Each variant names the stage that aborted the run and wraps the
//! originating error. Per-K model failures are not represented here; the
//! sweep records them as `KFailure` values and keeps going.
use crate::{
    config::ConfigError,
    panel::{DataAlignmentError, PanelError},
    preprocessing::PreprocessError,
    sweep::PersistError,
};
use thiserror::Error;

/// Result alias for pipeline entry points.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal run failure, tagged by stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration stage failed: {0}")]
    Configuration(#[from] ConfigError),

    #[error("panel loading stage failed: {0}")]
    Panel(#[from] PanelError),

    #[error("alignment stage failed: {0}")]
    Alignment(#[from] DataAlignmentError),

    #[error("split/scale stage failed: {0}")]
    Preprocessing(#[from] PreprocessError),

    #[error("persistence stage failed: {0}")]
    Persistence(#[from] PersistError),
}

impl PipelineError {
    /// Short stage name, for reports.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Panel(_) => "panel",
            PipelineError::Alignment(_) => "alignment",
            PipelineError::Preprocessing(_) => "preprocessing",
            PipelineError::Persistence(_) => "persistence",
        }
    }
}
