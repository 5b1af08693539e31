//! Panel alignment — merge macro features with sector returns.
//!
//! Purpose
//! -------
//! Produce the single, gap-free monthly panel the model consumes: the feature
//! panel (built on the macro timeline) and the returns panel restricted to
//! their common months, optionally windowed, with residual feature gaps
//! filled forward then backward.
//!
//! Key behaviors
//! -------------
//! - Both inputs are normalized to month ends before intersecting.
//! - Derived features are evaluated BEFORE the intersection, so lookbacks
//!   see the full macro history.
//! - The optional inclusive `[window_start, window_end]` is applied after the
//!   intersection.
//! - Every failure that would leave the model without valid input is a
//!   [`DataAlignmentError`], raised before any fit: empty intersection,
//!   empty window, too few months, an empty train or test side at the
//!   configured split fraction, a test window with no observed feature value,
//!   or a feature column with no observed value at all.
//! - Feature gaps are filled with forward-fill then back-fill, in that order.
//!   Return gaps are left as `NaN`; the performance summary skips them.
//!
//! Invariants & assumptions
//! ------------------------
//! - The returned [`AlignedPanel`] has strictly increasing month-end dates,
//!   finite features, and `features.nrows() == returns.nrows()`.
//!
//! Conventions
//! -----------
//! - Emits one `info` event with the aligned row count and date range.
use crate::{
    panel::{
        data::{MacroPanel, ReturnsPanel},
        errors::{AlignResult, DataAlignmentError},
        features::{build_feature_panel, FeatureLayout},
    },
    preprocessing::split::split_index,
};
use chrono::NaiveDate;
use ndarray::{s, Array2, ArrayViewMut1, Axis};
use std::collections::HashMap;
use tracing::info;

/// Options controlling alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignOptions {
    /// Inclusive lower bound of the analysis window.
    pub window_start: Option<NaiveDate>,
    /// Inclusive upper bound of the analysis window.
    pub window_end: Option<NaiveDate>,
    /// Minimum number of aligned months.
    pub min_rows: usize,
    /// Training share used to check that both split sides are non-empty.
    pub split_fraction: f64,
}

impl Default for AlignOptions {
    fn default() -> Self {
        AlignOptions { window_start: None, window_end: None, min_rows: 24, split_fraction: 0.7 }
    }
}

/// Aligned, gap-free model input plus the matching returns.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPanel {
    pub dates: Vec<NaiveDate>,
    pub feature_names: Vec<String>,
    /// `T×D`, finite.
    pub features: Array2<f64>,
    pub return_columns: Vec<String>,
    /// `T×S`, `NaN` where a return is missing.
    pub returns: Array2<f64>,
}

impl AlignedPanel {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Align the macro and returns panels.
///
/// Parameters
/// ----------
/// - `macro_panel`: `&MacroPanel`
/// - `returns_panel`: `&ReturnsPanel`
/// - `layout`: `&FeatureLayout`
///   Selected indicators followed by derived features.
/// - `opts`: `&AlignOptions`
///
/// Returns
/// -------
/// `AlignResult<AlignedPanel>`
///
/// Errors
/// ------
/// - See the module docs; every variant of [`DataAlignmentError`] except
///   `EmptyFeatureLayout`/`MissingIndicator` (raised by feature building)
///   originates here.
pub fn align_panels(
    macro_panel: &MacroPanel, returns_panel: &ReturnsPanel, layout: &FeatureLayout,
    opts: &AlignOptions,
) -> AlignResult<AlignedPanel> {
    let macro_panel = macro_panel.to_month_end()?;
    let returns_panel = returns_panel.to_month_end()?;
    let feature_panel = build_feature_panel(&macro_panel, layout)?;

    let returns_row: HashMap<NaiveDate, usize> =
        returns_panel.dates().iter().enumerate().map(|(row, d)| (*d, row)).collect();
    let pairs: Vec<(usize, usize)> = feature_panel
        .dates()
        .iter()
        .enumerate()
        .filter_map(|(row, d)| returns_row.get(d).map(|&r| (row, r)))
        .collect();
    if pairs.is_empty() {
        return Err(DataAlignmentError::EmptyIntersection);
    }

    let in_window = |d: NaiveDate| {
        opts.window_start.map_or(true, |start| d >= start)
            && opts.window_end.map_or(true, |end| d <= end)
    };
    let pairs: Vec<(usize, usize)> =
        pairs.into_iter().filter(|&(row, _)| in_window(feature_panel.dates()[row])).collect();
    if pairs.is_empty() {
        return Err(DataAlignmentError::EmptyWindow {
            start: opts.window_start,
            end: opts.window_end,
        });
    }
    let n = pairs.len();
    if n < opts.min_rows {
        return Err(DataAlignmentError::TooFewRows { rows: n, required: opts.min_rows });
    }
    let train_end = split_index(n, opts.split_fraction);
    if train_end == 0 {
        return Err(DataAlignmentError::EmptyTrainWindow {
            rows: n,
            split_fraction: opts.split_fraction,
        });
    }
    if train_end >= n {
        return Err(DataAlignmentError::EmptyTestWindow {
            rows: n,
            split_fraction: opts.split_fraction,
        });
    }

    let feature_rows: Vec<usize> = pairs.iter().map(|&(f, _)| f).collect();
    let return_rows: Vec<usize> = pairs.iter().map(|&(_, r)| r).collect();
    let dates: Vec<NaiveDate> = feature_rows.iter().map(|&r| feature_panel.dates()[r]).collect();
    let mut features = feature_panel.values().select(Axis(0), &feature_rows);
    let returns = returns_panel.values().select(Axis(0), &return_rows);

    if features.slice(s![train_end.., ..]).iter().all(|v| v.is_nan()) {
        return Err(DataAlignmentError::AllMissingTestWindow {
            rows: n - train_end,
            start: dates[train_end],
        });
    }
    for (j, name) in feature_panel.columns().iter().enumerate() {
        if features.column(j).iter().all(|v| v.is_nan()) {
            return Err(DataAlignmentError::AllMissingFeature { name: name.clone() });
        }
    }
    for col in features.axis_iter_mut(Axis(1)) {
        fill_forward_then_backward(col);
    }

    info!(
        rows = n,
        features = features.ncols(),
        start = %dates[0],
        end = %dates[n - 1],
        "aligned macro and returns panels"
    );
    Ok(AlignedPanel {
        dates,
        feature_names: feature_panel.columns().to_vec(),
        features,
        return_columns: returns_panel.columns().to_vec(),
        returns,
    })
}

/// Replace `NaN`s by the last observed value, then fill any leading `NaN`s
/// with the first observed value.
pub fn fill_forward_then_backward(mut col: ArrayViewMut1<f64>) {
    let mut last = f64::NAN;
    for v in col.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
    let mut next = f64::NAN;
    for v in col.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}
