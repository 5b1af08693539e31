//! panel — monthly panel ingestion, feature building and alignment.
//!
//! Purpose
//! -------
//! Build the aligned monthly panel the regime model consumes from two
//! pre-cleaned inputs: the macro indicator panel and the sector-return panel.
//!
//! Key behaviors
//! -------------
//! - [`TimePanel`]: validated, month-indexed value matrix with `NaN` for
//!   missing cells ([`MacroPanel`] and [`ReturnsPanel`] are aliases).
//! - [`read_panel_csv`]: schema-level CSV ingestion with month-end
//!   normalization.
//! - [`FeatureLayout`] / [`DerivedFeatures`]: the fixed feature order
//!   (selected indicators, then spread and year-over-year features).
//! - [`align_panels`]: feature building on the macro timeline, intersection
//!   with the returns timeline, optional window, fatal-condition checks and
//!   forward/backward gap filling.
//!
//! Invariants & assumptions
//! ------------------------
//! - All dates are month ends; indices are strictly increasing.
//! - An [`AlignedPanel`] always has finite features and non-empty train and
//!   test windows at the configured split fraction.
//!
//! Downstream usage
//! ----------------
//! - The pipeline aligns once per run and hands `AlignedPanel::features` to
//!   `preprocessing::split_and_scale`, keeping `returns` for the performance
//!   summary.

pub mod align;
pub mod calendar;
pub mod data;
pub mod errors;
pub mod features;
pub mod io;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::align::{align_panels, fill_forward_then_backward, AlignOptions, AlignedPanel};
pub use self::calendar::{month_end, month_ordinal};
pub use self::data::{MacroPanel, ReturnsPanel, TimePanel};
pub use self::errors::{AlignResult, DataAlignmentError, PanelError, PanelResult};
pub use self::features::{
    build_feature_panel, year_over_year, DerivedFeatures, FeatureLayout, SpreadFeature,
    YoyFeature,
};
pub use self::io::{read_panel, read_panel_csv};

pub mod prelude {
    pub use super::align::{align_panels, AlignOptions, AlignedPanel};
    pub use super::data::{MacroPanel, ReturnsPanel, TimePanel};
    pub use super::errors::{DataAlignmentError, PanelError};
    pub use super::features::{DerivedFeatures, FeatureLayout};
    pub use super::io::read_panel_csv;
}
