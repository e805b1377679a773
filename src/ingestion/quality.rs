//! Row quality filtering.

use crate::types::RawRecord;

/// Default share of filled values a row needs to be kept (0.6).
pub const DEFAULT_MIN_FILLED_PERCENT: u8 = 60;

/// Accepts rows that carry enough data to be worth persisting.
///
/// A row is accepted when `non_empty / total_columns >= min_filled_percent / 100`, where
/// `total_columns` is fixed for the whole file (the column count of the sample row). The
/// comparison is done in integers so thresholds like 6/10 are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowQualityFilter {
    min_filled_percent: u8,
}

impl RowQualityFilter {
    /// # Panics
    ///
    /// Panics if `min_filled_percent > 100`.
    pub fn new(min_filled_percent: u8) -> Self {
        assert!(min_filled_percent <= 100, "min_filled_percent must be <= 100");
        Self { min_filled_percent }
    }

    pub fn min_filled_percent(&self) -> u8 {
        self.min_filled_percent
    }

    pub fn accept(&self, row: &RawRecord, total_columns: usize) -> bool {
        if total_columns == 0 {
            return false;
        }
        row.non_empty_count() * 100 >= total_columns * usize::from(self.min_filled_percent)
    }
}

impl Default for RowQualityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FILLED_PERCENT)
    }
}
