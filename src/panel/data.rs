//! Time-indexed panel container for macro indicators and sector returns.
//!
//! Purpose
//! -------
//! Provide a small, validated container for monthly panels: a strictly
//! increasing date index, named columns, and a `T×N` value matrix in which
//! missing observations are `NaN`. Both inputs of the pipeline (the macro
//! indicator panel and the sector-return panel) use this type.
//!
//! Key behaviors
//! -------------
//! - [`TimePanel::new`] enforces index/column/shape invariants.
//! - [`TimePanel::to_month_end`] normalizes every date to its month end and
//!   rejects months that collapse onto each other.
//! - Column lookup by name ([`TimePanel::column`], [`TimePanel::select`]) and
//!   row subsetting ([`TimePanel::take_rows`]) return new panels; a panel is
//!   never mutated after construction.
//!
//! Invariants & assumptions
//! ------------------------
//! - `dates.len() == values.nrows()` and `columns.len() == values.ncols()`.
//! - Dates are strictly increasing; column names are unique and non-empty
//!   in number.
//! - Values may be `NaN` (missing) but never `±∞`; `±∞` cells are stored as
//!   `NaN` by the constructor.
//!
//! Conventions
//! -----------
//! - Row `t` is the month `dates[t]`; column `j` is `columns[j]`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover constructor failures, month-end normalization and
//!   column selection.
use crate::panel::{
    calendar::month_end,
    errors::{PanelError, PanelResult},
};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::HashSet;

/// Monthly panel of named numeric columns with `NaN` for missing cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TimePanel {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

/// Macro indicator panel.
pub type MacroPanel = TimePanel;
/// Sector-return panel.
pub type ReturnsPanel = TimePanel;

impl TimePanel {
    /// Construct a validated panel.
    ///
    /// Parameters
    /// ----------
    /// - `dates`: `Vec<NaiveDate>`
    ///   Strictly increasing row index.
    /// - `columns`: `Vec<String>`
    ///   Unique column names (at least one).
    /// - `values`: `Array2<f64>`
    ///   `dates.len() × columns.len()` values; `NaN` marks missing cells.
    ///
    /// Errors
    /// ------
    /// - `PanelError::NoColumns`, `PanelError::DuplicateColumn`
    /// - `PanelError::ShapeMismatch`
    /// - `PanelError::DuplicateDate`, `PanelError::NonIncreasingDates`
    pub fn new(
        dates: Vec<NaiveDate>, columns: Vec<String>, mut values: Array2<f64>,
    ) -> PanelResult<Self> {
        if columns.is_empty() {
            return Err(PanelError::NoColumns);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PanelError::DuplicateColumn { name: name.clone() });
            }
        }
        if values.nrows() != dates.len() || values.ncols() != columns.len() {
            return Err(PanelError::ShapeMismatch {
                rows: values.nrows(),
                cols: values.ncols(),
                expected_rows: dates.len(),
                expected_cols: columns.len(),
            });
        }
        for (index, pair) in dates.windows(2).enumerate() {
            if pair[1] == pair[0] {
                return Err(PanelError::DuplicateDate { date: pair[1] });
            }
            if pair[1] < pair[0] {
                return Err(PanelError::NonIncreasingDates {
                    index: index + 1,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        values.mapv_inplace(|v| if v.is_finite() { v } else { f64::NAN });
        Ok(TimePanel { dates, columns, values })
    }

    /// Copy of the panel with every date moved to its month end.
    ///
    /// # Errors
    /// - `PanelError::DuplicateDate` if two rows fall in the same month.
    pub fn to_month_end(&self) -> PanelResult<TimePanel> {
        let dates = self.dates.iter().map(|d| month_end(*d)).collect();
        TimePanel::new(dates, self.columns.clone(), self.values.clone())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of rows (months).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Position of column `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// View of column `name`.
    ///
    /// # Errors
    /// - `PanelError::UnknownColumn` if the column does not exist.
    pub fn column(&self, name: &str) -> PanelResult<ArrayView1<'_, f64>> {
        self.column_index(name)
            .map(|j| self.values.column(j))
            .ok_or_else(|| PanelError::UnknownColumn { name: name.to_string() })
    }

    /// New panel with the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> PanelResult<TimePanel> {
        let idx = names
            .iter()
            .map(|n| {
                self.column_index(n).ok_or_else(|| PanelError::UnknownColumn { name: n.clone() })
            })
            .collect::<PanelResult<Vec<_>>>()?;
        TimePanel::new(self.dates.clone(), names.to_vec(), self.values.select(Axis(1), &idx))
    }

    /// New panel with the given rows (which must be increasing).
    pub fn take_rows(&self, rows: &[usize]) -> PanelResult<TimePanel> {
        let dates = rows.iter().map(|&r| self.dates[r]).collect();
        TimePanel::new(dates, self.columns.clone(), self.values.select(Axis(0), rows))
    }
}
