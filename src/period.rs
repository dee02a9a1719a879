use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{Error, Result};

/// Parse a time period into its inclusive date range.
///
/// - `"YYYY"` covers Jan 1 to Dec 31 of that year.
/// - `"YYYY-MM"` covers the first to the last calendar day of that month.
///
/// Anything else is [`Error::InvalidPeriodFormat`].
pub fn parse_time_period(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || Error::InvalidPeriodFormat(period.to_string());
    let p = period;
    match p.len() {
        4 => {
            let year = parse_digits::<i32>(p).ok_or_else(invalid)?;
            let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
            let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid)?;
            Ok((start, end))
        }
        7 => {
            let (y, m) = p.split_once('-').ok_or_else(invalid)?;
            if y.len() != 4 || m.len() != 2 {
                return Err(invalid());
            }
            let year = parse_digits::<i32>(y).ok_or_else(invalid)?;
            let month = parse_digits::<u32>(m).ok_or_else(invalid)?;
            let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
            let end = last_day_of_month(start).ok_or_else(invalid)?;
            Ok((start, end))
        }
        _ => Err(invalid()),
    }
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    // Reject signs and whitespace that `str::parse` would otherwise accept.
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Last calendar day of the month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d - Duration::days(1))
}

/// Every calendar day in `[start, end]`, in order.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

pub fn yyyymmdd(date: &NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

/// `YYYY-MM-DD`, the form the archive expects in the `date` keyword.
pub fn iso_date(date: &NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}
