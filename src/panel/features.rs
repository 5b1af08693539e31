//! Feature layout and derived features.
//!
//! Purpose
//! -------
//! Turn the raw macro panel into the fixed-order feature panel fed to the
//! model: the selected indicators first, then the derived features.
//!
//! Key behaviors
//! -------------
//! - [`SpreadFeature`]: `long − short`, missing if either input is missing.
//! - [`YoyFeature`]: `x_t / x_{t−12} − 1` where `t−12` is the same month one
//!   year earlier; missing if that month is absent from the panel, if either
//!   value is missing, or if the lagged value is zero.
//! - [`build_feature_panel`] evaluates the layout on the macro panel's own
//!   timeline, so the 12-month lookback uses every available macro month and
//!   not only the months shared with the returns panel.
//!
//! Invariants & assumptions
//! ------------------------
//! - Feature order is fixed by [`FeatureLayout::names`] and identical for
//!   training and inference.
//! - Missing values are left as `NaN` here; gap filling happens after
//!   alignment.
use crate::panel::{
    calendar::month_ordinal,
    data::{MacroPanel, TimePanel},
    errors::{AlignResult, DataAlignmentError},
};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Difference between two rate series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadFeature {
    pub name: String,
    pub long: String,
    pub short: String,
}

/// Trailing 12-month percentage change of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoyFeature {
    pub name: String,
    pub source: String,
}

/// Derived-feature configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedFeatures {
    pub spread: Option<SpreadFeature>,
    pub yoy: Vec<YoyFeature>,
}

impl Default for DerivedFeatures {
    fn default() -> Self {
        DerivedFeatures {
            spread: Some(SpreadFeature {
                name: "Yield_Curve_Slope".into(),
                long: "10Y_Treasury".into(),
                short: "2Y_Treasury".into(),
            }),
            yoy: vec![
                YoyFeature { name: "IP_YoY".into(), source: "Industrial_Production_Index".into() },
                YoyFeature { name: "Inflation_YoY".into(), source: "CPI_(All_Items)".into() },
            ],
        }
    }
}

impl DerivedFeatures {
    /// No derived features; the layout is the selected indicators only.
    pub fn none() -> Self {
        DerivedFeatures { spread: None, yoy: Vec::new() }
    }

    /// Derived-feature names in layout order (spread first, then YoY).
    pub fn names(&self) -> Vec<String> {
        self.spread
            .iter()
            .map(|s| s.name.clone())
            .chain(self.yoy.iter().map(|y| y.name.clone()))
            .collect()
    }
}

/// Complete feature layout: selected indicators followed by derived features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub indicators: Vec<String>,
    pub derived: DerivedFeatures,
}

impl FeatureLayout {
    pub fn new(indicators: Vec<String>, derived: DerivedFeatures) -> Self {
        FeatureLayout { indicators, derived }
    }

    /// Column names of the feature panel, in order.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.indicators.clone();
        names.extend(self.derived.names());
        names
    }

    pub fn len(&self) -> usize {
        self.indicators.len() + self.derived.spread.iter().count() + self.derived.yoy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evaluate `layout` on the macro panel's own timeline.
///
/// Parameters
/// ----------
/// - `macro_panel`: `&MacroPanel`
///   Month-end normalized macro panel.
/// - `layout`: `&FeatureLayout`
///
/// Returns
/// -------
/// `AlignResult<TimePanel>`
///   Panel with the macro dates and `layout.names()` columns; may contain
///   `NaN`.
///
/// Errors
/// ------
/// - `DataAlignmentError::EmptyFeatureLayout` for an empty layout.
/// - `DataAlignmentError::MissingIndicator` for unknown source columns.
/// - `DataAlignmentError::Panel` for duplicate feature names.
pub fn build_feature_panel(
    macro_panel: &MacroPanel, layout: &FeatureLayout,
) -> AlignResult<TimePanel> {
    if layout.is_empty() {
        return Err(DataAlignmentError::EmptyFeatureLayout);
    }
    let lookup = |name: &str| {
        macro_panel
            .column(name)
            .map_err(|_| DataAlignmentError::MissingIndicator { name: name.to_string() })
    };
    let n = macro_panel.len();
    let mut columns: Vec<Array1<f64>> = Vec::with_capacity(layout.len());
    for name in &layout.indicators {
        columns.push(lookup(name)?.to_owned());
    }
    if let Some(spread) = &layout.derived.spread {
        let long = lookup(&spread.long)?;
        let short = lookup(&spread.short)?;
        columns.push(&long - &short);
    }
    for yoy in &layout.derived.yoy {
        let source = lookup(&yoy.source)?;
        columns.push(year_over_year(macro_panel, source));
    }

    let mut values = Array2::<f64>::from_elem((n, columns.len()), f64::NAN);
    for (j, col) in columns.iter().enumerate() {
        values.column_mut(j).assign(col);
    }
    TimePanel::new(macro_panel.dates().to_vec(), layout.names(), values)
        .map_err(DataAlignmentError::from)
}

/// `x_t / x_{t−12 months} − 1` over the panel's dates.
pub fn year_over_year(panel: &TimePanel, source: ArrayView1<f64>) -> Array1<f64> {
    let by_month: HashMap<i64, usize> =
        panel.dates().iter().enumerate().map(|(row, d)| (month_ordinal(*d), row)).collect();
    let mut out = Array1::<f64>::from_elem(panel.len(), f64::NAN);
    for (row, date) in panel.dates().iter().enumerate() {
        let Some(&lag_row) = by_month.get(&(month_ordinal(*date) - 12)) else {
            continue;
        };
        let (now, then) = (source[row], source[lag_row]);
        if now.is_finite() && then.is_finite() && then != 0.0 {
            out[row] = now / then - 1.0;
        }
    }
    out
}
