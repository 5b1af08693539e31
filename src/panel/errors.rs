//! Errors for panel ingestion and alignment.
//!
//! This module defines two error types:
//! - [`PanelError`]: schema and I/O failures while building a [`TimePanel`]
//!   (unreadable CSV, bad dates/values, duplicate or non-increasing dates,
//!   ragged rows, unknown columns).
//! - [`DataAlignmentError`]: failures that leave no valid model input after
//!   merging the macro and returns panels. These are fatal for the whole run
//!   and are raised before any model is fitted.
//!
//! ## Conventions
//! - Row indices are 0-based data rows (the CSV header is not counted).
//! - Dates are reported after month-end normalization.
//!
//! [`TimePanel`]: crate::panel::TimePanel
use chrono::NaiveDate;
use thiserror::Error;

/// Result alias for panel construction and ingestion.
pub type PanelResult<T> = Result<T, PanelError>;

/// Result alias for alignment and feature building.
pub type AlignResult<T> = Result<T, DataAlignmentError>;

/// Schema/IO failures while building a time-indexed panel.
#[derive(Debug, Error)]
pub enum PanelError {
    // ---- I/O ----
    #[error("Failed to open panel file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    // ---- Schema ----
    #[error("Panel '{path}' must start with a 'Date' column; found '{found}'")]
    MissingDateColumn { path: String, found: String },

    #[error("Row {row}: cannot parse date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },

    #[error("Row {row}, column '{column}': cannot parse numeric value '{value}'")]
    InvalidValue { row: usize, column: String, value: String },

    #[error("Row {row} has {actual} value columns; expected {expected}")]
    RaggedRow { row: usize, expected: usize, actual: usize },

    #[error("Duplicate column name '{name}'")]
    DuplicateColumn { name: String },

    #[error("Panel has no value columns")]
    NoColumns,

    #[error("Unknown column '{name}'")]
    UnknownColumn { name: String },

    #[error("Value matrix is {rows}x{cols}; expected {expected_rows}x{expected_cols}")]
    ShapeMismatch { rows: usize, cols: usize, expected_rows: usize, expected_cols: usize },

    // ---- Time index ----
    #[error("Duplicate month {date} in panel index")]
    DuplicateDate { date: NaiveDate },

    #[error("Dates must be strictly increasing: {prev} is followed by {next} at row {index}")]
    NonIncreasingDates { index: usize, prev: NaiveDate, next: NaiveDate },
}

/// Alignment failures: no valid model input exists.
#[derive(Debug, Error)]
pub enum DataAlignmentError {
    // ---- Feature layout ----
    #[error("Indicator '{name}' is not a column of the macro panel")]
    MissingIndicator { name: String },

    #[error("Feature '{name}' has no observed value in the aligned window")]
    AllMissingFeature { name: String },

    #[error("Feature layout is empty: select at least one indicator or derived feature")]
    EmptyFeatureLayout,

    // ---- Timeline ----
    #[error("Macro and returns panels share no months")]
    EmptyIntersection,

    #[error("No aligned months fall inside the window [{start:?}, {end:?}]")]
    EmptyWindow { start: Option<NaiveDate>, end: Option<NaiveDate> },

    #[error("Aligned panel has {rows} months; at least {required} are required")]
    TooFewRows { rows: usize, required: usize },

    // ---- Split windows ----
    #[error("Training window is empty: {rows} aligned months at split fraction {split_fraction}")]
    EmptyTrainWindow { rows: usize, split_fraction: f64 },

    #[error("Test window is empty: {rows} aligned months at split fraction {split_fraction}")]
    EmptyTestWindow { rows: usize, split_fraction: f64 },

    #[error("Test window ({rows} months starting {start}) has no observed feature values")]
    AllMissingTestWindow { rows: usize, start: NaiveDate },

    // ---- Wrapped ----
    #[error(transparent)]
    Panel(#[from] PanelError),
}
