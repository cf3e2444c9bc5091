//! Calendar helpers shared by the dashboard, the weekly views and exports.
//!
//! All dates are plain calendar days (`YYYY-MM-DD`) with no time zone. A week
//! key names the inclusive window that starts on that day and ends six days
//! later.

use chrono::{Datelike, Duration, Local, NaiveDate};

use crate::error::{DonationError, Result};
use crate::record::DonationRecord;

pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Parse an ISO calendar date, ignoring surrounding whitespace.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, ISO_FORMAT)
        .map_err(|_| DonationError::BadDate(trimmed.to_string()))
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

pub fn iso_add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Today's date in the server's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// First and last day (inclusive) of the week starting at `start`.
pub fn week_range(start: NaiveDate) -> (NaiveDate, NaiveDate) {
    (start, iso_add_days(start, 6))
}

pub fn is_in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}

/// Label used in selectors and report headers, e.g. `Week of Oct 21`.
pub fn format_week_label(start: NaiveDate) -> String {
    format!("Week of {} {}", start.format("%b"), start.day())
}

/// Monday = 0 ... Sunday = 6.
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Monday of the calendar week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    iso_add_days(date, -(weekday_index(date) as i64))
}

/// Most recent donation date in the collection.
pub fn latest_date(records: &[DonationRecord]) -> Option<NaiveDate> {
    records.iter().map(|r| r.date).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    #[test]
    fn parses_and_rejects_dates() {
        assert_eq!(d(" 2025-10-21 "), NaiveDate::from_ymd_opt(2025, 10, 21).unwrap());
        assert!(matches!(parse_iso_date("10/21"), Err(DonationError::BadDate(_))));
        assert!(parse_iso_date("2025-02-30").is_err());
    }

    #[test]
    fn week_range_spans_seven_days_inclusive() {
        let (start, end) = week_range(d("2025-10-27"));
        assert_eq!(end, d("2025-11-02"));
        assert!(is_in_range(start, start, end));
        assert!(is_in_range(end, start, end));
        assert!(!is_in_range(d("2025-11-03"), start, end));
        assert!(!is_in_range(d("2025-10-26"), start, end));
    }

    #[test]
    fn week_label_is_short_month_and_day() {
        assert_eq!(format_week_label(d("2025-10-21")), "Week of Oct 21");
        assert_eq!(format_week_label(d("2025-11-03")), "Week of Nov 3");
    }

    #[test]
    fn weekday_index_starts_on_monday() {
        assert_eq!(weekday_index(d("2025-10-20")), 0);
        assert_eq!(weekday_index(d("2025-10-26")), 6);
        assert_eq!(monday_of(d("2025-10-23")), d("2025-10-20"));
        assert_eq!(monday_of(d("2025-10-20")), d("2025-10-20"));
    }

    #[test]
    fn add_days_crosses_month_boundary() {
        assert_eq!(iso_add_days(d("2025-10-30"), 3), d("2025-11-02"));
        assert_eq!(to_iso(iso_add_days(d("2025-01-01"), -1)), "2024-12-31");
    }
}
