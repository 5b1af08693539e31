//! Errors for the chronological split and feature standardization.
use thiserror::Error;

/// Result alias for split/scale operations.
pub type PreprocessResult<T> = Result<T, PreprocessError>;

/// Split/scale failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    // ---- Split ----
    #[error("Split fraction must lie strictly between 0 and 1; got {fraction}")]
    InvalidSplitFraction { fraction: f64 },

    #[error("Training window is empty ({rows} rows at split fraction {fraction})")]
    EmptyTrainWindow { rows: usize, fraction: f64 },

    #[error("Test window is empty ({rows} rows at split fraction {fraction})")]
    EmptyTestWindow { rows: usize, fraction: f64 },

    // ---- Scale ----
    #[error("Feature matrix has no columns")]
    NoFeatures,

    #[error("Feature value at row {row}, column {column} is non-finite: {value}")]
    NonFiniteFeature { row: usize, column: usize, value: f64 },

    #[error("Scaler was fit on {expected} features; got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
