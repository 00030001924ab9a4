// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Timestamp parsing and time bucketing

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};

use crate::config::TimeBucket;
use crate::table::CellValue;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Largest serial day number spreadsheet tools accept (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Calendar date of a timestamp cell, or `None` when it cannot be read
pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Null => None,
        CellValue::Date(date) => Some(*date),
        CellValue::DateTime(datetime) => Some(datetime.date()),
        CellValue::Number(serial) => from_excel_serial(*serial),
        CellValue::Text(text) => parse_text(text.trim()),
    }
}

fn parse_text(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Spreadsheet serial day number (days since 1899-12-30), fraction ignored
fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// First day of the bucket containing `date` (weeks start on Monday)
pub fn bucket_start(date: NaiveDate, bucket: TimeBucket) -> NaiveDate {
    match bucket {
        TimeBucket::Day => date,
        TimeBucket::Week => {
            let offset = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(offset)).unwrap_or(date)
        }
    }
}

/// Start of the bucket after the one starting at `start`
pub fn next_bucket(start: NaiveDate, bucket: TimeBucket) -> Option<NaiveDate> {
    let step = match bucket {
        TimeBucket::Day => 1,
        TimeBucket::Week => 7,
    };
    start.checked_add_days(Days::new(step))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_text_formats() {
        let expected = ymd(2024, 3, 14);
        for text in [
            "2024-03-14",
            "2024-03-14 09:30:00",
            "14/03/2024",
            "03/14/2024",
            "14-03-2024",
            "2024/03/14",
            "14/03/2024 09:30:00",
            "2024-03-14T09:30:00+01:00",
        ] {
            assert_eq!(parse_timestamp(&CellValue::from(text)), Some(expected), "{}", text);
        }
    }

    #[test]
    fn test_day_first_wins_when_ambiguous() {
        assert_eq!(
            parse_timestamp(&CellValue::from("02/03/2024")),
            Some(ymd(2024, 3, 2))
        );
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(parse_timestamp(&CellValue::from("yesterday")), None);
        assert_eq!(parse_timestamp(&CellValue::from("  ")), None);
        assert_eq!(parse_timestamp(&CellValue::Null), None);
        assert_eq!(parse_timestamp(&CellValue::Number(f64::NAN)), None);
        assert_eq!(parse_timestamp(&CellValue::Number(-3.0)), None);
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(parse_timestamp(&CellValue::Number(45365.0)), Some(ymd(2024, 3, 14)));
        assert_eq!(parse_timestamp(&CellValue::Number(45365.75)), Some(ymd(2024, 3, 14)));
    }

    #[test]
    fn test_week_bucket_starts_monday() {
        // 2024-03-14 is a Thursday
        assert_eq!(bucket_start(ymd(2024, 3, 14), TimeBucket::Week), ymd(2024, 3, 11));
        assert_eq!(bucket_start(ymd(2024, 3, 11), TimeBucket::Week), ymd(2024, 3, 11));
        assert_eq!(bucket_start(ymd(2024, 3, 17), TimeBucket::Week), ymd(2024, 3, 11));
        assert_eq!(bucket_start(ymd(2024, 3, 14), TimeBucket::Day), ymd(2024, 3, 14));
    }

    #[test]
    fn test_next_bucket() {
        assert_eq!(next_bucket(ymd(2024, 3, 11), TimeBucket::Week), Some(ymd(2024, 3, 18)));
        assert_eq!(next_bucket(ymd(2024, 2, 29), TimeBucket::Day), Some(ymd(2024, 3, 1)));
    }
}
