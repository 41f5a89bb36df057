// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and calendar arithmetic.
//!
//! Calendar questions (which day is "today", which month a session belongs
//! to) are answered in the configured local offset, not in UTC.

use chrono::{
    DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc,
};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Calendar date of `at` in the given offset.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// "YYYY-MM" key for the month containing `date`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse a "YYYY-MM" key back to the first day of that month.
pub fn parse_month_key(key: &str) -> Option<NaiveDate> {
    let (year, month) = key.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// First day of the month `months_back` months before the month of `date`.
pub fn month_start(date: NaiveDate, months_back: u32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 - months_back as i32;
    let year = index.div_euclid(12);
    let month0 = index.rem_euclid(12) as u32;
    // Day 1 exists in every month
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(date)
}

/// UTC bounds `[start, end)` of the local calendar month `months_back`
/// months before the month containing `today`.
pub fn month_window(
    today: NaiveDate,
    months_back: u32,
    offset: FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = month_start(today, months_back);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
    (local_midnight(first, offset), local_midnight(next, offset))
}

/// UTC instant of local midnight at the start of `date`.
fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
