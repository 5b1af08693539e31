//! Chronological train/test split.
//!
//! The training window is the first `floor(fraction × T)` rows and the test
//! window is the remainder. Both are contiguous and the training window
//! strictly precedes the test window, so no future observation can reach the
//! training statistics.
use crate::preprocessing::errors::{PreprocessError, PreprocessResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Boundary of a chronological split over `n_rows` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronoSplit {
    /// Exclusive end of the training window (= first test row).
    pub train_end: usize,
    /// Total number of rows.
    pub n_rows: usize,
}

/// `floor(fraction × n_rows)`, clamped to `n_rows`.
pub fn split_index(n_rows: usize, fraction: f64) -> usize {
    ((fraction * n_rows as f64).floor() as usize).min(n_rows)
}

impl ChronoSplit {
    /// Split `n_rows` rows at `fraction`.
    ///
    /// # Errors
    /// - `PreprocessError::InvalidSplitFraction` unless `0 < fraction < 1`.
    /// - `PreprocessError::EmptyTrainWindow` / `EmptyTestWindow` when either
    ///   side would have no rows.
    pub fn new(n_rows: usize, fraction: f64) -> PreprocessResult<Self> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(PreprocessError::InvalidSplitFraction { fraction });
        }
        let train_end = split_index(n_rows, fraction);
        if train_end == 0 {
            return Err(PreprocessError::EmptyTrainWindow { rows: n_rows, fraction });
        }
        if train_end == n_rows {
            return Err(PreprocessError::EmptyTestWindow { rows: n_rows, fraction });
        }
        Ok(ChronoSplit { train_end, n_rows })
    }

    pub fn train_range(&self) -> Range<usize> {
        0..self.train_end
    }

    pub fn test_range(&self) -> Range<usize> {
        self.train_end..self.n_rows
    }

    pub fn train_len(&self) -> usize {
        self.train_end
    }

    pub fn test_len(&self) -> usize {
        self.n_rows - self.train_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // The boundary truncates: 10 rows at 0.7 → 7 train, 3 test; 9 rows at 0.7
    // → floor(6.3) = 6.
    fn boundary_truncates() {
        let s = ChronoSplit::new(10, 0.7).unwrap();
        assert_eq!(s.train_range(), 0..7);
        assert_eq!(s.test_range(), 7..10);

        assert_eq!(ChronoSplit::new(9, 0.7).unwrap().train_len(), 6);
    }

    #[test]
    // Purpose
    // -------
    // Degenerate fractions and tiny panels fail explicitly.
    fn degenerate_splits_fail() {
        assert!(matches!(
            ChronoSplit::new(10, 1.0),
            Err(PreprocessError::InvalidSplitFraction { .. })
        ));
        assert!(matches!(
            ChronoSplit::new(1, 0.5),
            Err(PreprocessError::EmptyTrainWindow { .. })
        ));

        // floor(f·n) < n for any f < 1, so the test window keeps at least one row.
        let s = ChronoSplit::new(2, 0.99).unwrap();
        assert_eq!((s.train_len(), s.test_len()), (1, 1));
    }
}
