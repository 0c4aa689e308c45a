//! Date grids and calendar filters.

use crate::domain::IndexSeries;
use chrono::{Datelike, NaiveDate, Weekday};

/// First day of the default sample and synthetic window.
pub const DEFAULT_START: NaiveDate = ymd(2018, 1, 1);
/// Last day of the default sample and synthetic window.
pub const DEFAULT_END: NaiveDate = ymd(2023, 12, 31);

/// Calendar date checked at compile time when used in a `const`.
const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

/// Month-end dates falling inside `[start, end]`.
pub fn month_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    loop {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let Some(month_end) =
            NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
        else {
            break;
        };
        if month_end > end {
            break;
        }
        if month_end >= start {
            dates.push(month_end);
        }
        year = next_year;
        month = next_month;
    }
    dates
}

/// Quarter-end dates (Mar/Jun/Sep/Dec month ends) inside `[start, end]`.
pub fn quarter_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    month_ends(start, end)
        .into_iter()
        .filter(|d| d.month() % 3 == 0)
        .collect()
}

/// Monday-to-Friday dates inside `[start, end]`.
pub fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_business_day(*d))
        .collect()
}

/// Weekday check only; exchange holidays are not modelled.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Drop weekend observations from a daily financial series.
///
/// Fetches return raw points; callers that treat a source as
/// financial-daily apply this explicitly.
pub fn business_days_only(series: &IndexSeries) -> IndexSeries {
    series.filtered(|o| is_business_day(o.date))
}
