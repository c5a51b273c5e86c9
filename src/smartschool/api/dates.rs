//! Date strings as the platform writes them: `year-month-day` without zero
//! padding, e.g. `2019-11-9`.

use chrono::{Datelike, NaiveDate};

pub fn to_remote(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}

/// Parses a platform date. Returns `None` when the text does not have three
/// numeric parts or names a day that does not exist.
pub fn from_remote(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('-');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
