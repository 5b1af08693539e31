//! Monthly calendar helpers.
//!
//! Panels are indexed by month; every timestamp is normalized to the last
//! calendar day of its month, and lags are taken in whole calendar months via
//! [`month_ordinal`].
use chrono::{Datelike, Months, NaiveDate};

/// Last calendar day of `date`'s month.
///
/// Falls back to `date` itself only at the upper edge of chrono's range.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Months since year 0 (`year · 12 + month0`); differences give calendar-month
/// lags.
pub fn month_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}
