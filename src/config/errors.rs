//! Errors for run configuration loading and validation.
//!
//! Every variant is fatal and raised before any computation starts.
use crate::hmm::HmmError;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid or unreadable run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    // ---- Loading ----
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Configuration field `{field}` is required for this entry point")]
    MissingPath { field: &'static str },

    // ---- Split / sweep ----
    #[error("split_fraction must lie strictly between 0 and 1; got {value}")]
    InvalidSplitFraction { value: f64 },

    #[error("regime_count_range must satisfy 1 <= min <= max; got [{min}, {max}]")]
    InvalidRegimeRange { min: usize, max: usize },

    #[error("periods_per_year must be finite and > 0; got {value}")]
    InvalidPeriodsPerYear { value: f64 },

    // ---- Estimation ----
    #[error("em_max_iterations must be >= 1; got {value}")]
    InvalidMaxIterations { value: usize },

    #[error("em_tolerance must be finite and > 0; got {value}")]
    InvalidTolerance { value: f64 },

    #[error("covariance_regularization must be finite and > 0; got {value}")]
    InvalidRegularization { value: f64 },

    #[error("Invalid estimator settings: {0}")]
    Estimator(#[from] HmmError),

    // ---- Features / window ----
    #[error("selected_indicator_names must not be empty")]
    EmptyIndicators,

    #[error("Feature name `{name}` appears more than once in the layout")]
    DuplicateFeature { name: String },

    #[error("window_start {start} is after window_end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("min_aligned_rows must be >= {required}; got {value}")]
    MinRowsTooSmall { value: usize, required: usize },
}
