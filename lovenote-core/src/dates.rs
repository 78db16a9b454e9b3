//! Calendar-date arithmetic. Time of day never enters these calculations.

use chrono::NaiveDate;

use crate::error::{LoveNoteError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whole days from `a` to `b`. Negative when `b` comes before `a`.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// Parses a `YYYY-MM-DD` date, naming the setting it came from on failure.
pub fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        LoveNoteError::Configuration(format!(
            "{key} must be a YYYY-MM-DD date, got '{value}': {e}"
        ))
    })
}
