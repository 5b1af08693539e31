//! preprocessing — chronological split and train-only standardization.
//!
//! Purpose
//! -------
//! Turn the aligned, gap-free feature matrix into the two model inputs
//! (scaled training and test matrices) without letting any statistic of the
//! test window leak into the transform.
//!
//! Key behaviors
//! -------------
//! - [`ChronoSplit`]: `train = rows[0 .. floor(fraction·T))`, `test = rest`.
//! - [`ScalerParams`]: per-feature mean and population standard deviation
//!   fitted on training rows; constant features scale to 0.
//! - [`split_and_scale`]: both steps at once, returning a [`ScaledSplit`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The training window strictly precedes the test window.
//! - Scaler parameters are immutable once fitted and are applied identically
//!   to both windows.

pub mod errors;
pub mod scaler;
pub mod split;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{PreprocessError, PreprocessResult};
pub use self::scaler::{split_and_scale, ScaledSplit, ScalerParams, CONSTANT_STD_TOL};
pub use self::split::{split_index, ChronoSplit};

pub mod prelude {
    pub use super::errors::{PreprocessError, PreprocessResult};
    pub use super::scaler::{split_and_scale, ScaledSplit, ScalerParams};
    pub use super::split::ChronoSplit;
}
