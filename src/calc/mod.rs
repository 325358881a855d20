//! Derived-field calculations and date/time conversions.
//!
//! Age is a plain floor of elapsed days over 365, not a calendar
//! difference; the sheet has always been filled that way and the relational
//! mirror stores the same number. Weekday and month names are the uppercase
//! Portuguese strings the sheet uses.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Timelike};

use crate::schema::domains::{MONTH_NAMES, WEEKDAY_NAMES};

/// Date formats accepted when reading cells, tried in order
pub const SHEET_DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y"];

/// Base date for spreadsheet serial numbers
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Completed years between birth and death, as floor(days / 365)
///
/// Returns `None` when either date is missing or death precedes birth.
#[must_use]
pub fn age(birth: Option<NaiveDate>, death: Option<NaiveDate>) -> Option<i64> {
    let birth = birth?;
    let death = death?;

    let days = (death - birth).num_days();
    if days < 0 {
        return None;
    }

    Some(days / 365)
}

/// Uppercase Portuguese weekday name, Monday first
#[must_use]
pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

/// Uppercase Portuguese month name
#[must_use]
pub fn month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

/// Render a date the way the sheet stores it, `dd/mm/yyyy`
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Render a time the way the sheet stores it, `HH:MM`
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Parse a date cell trying every accepted sheet format
///
/// # Arguments
/// * `value` - Raw cell text, surrounding whitespace ignored
///
/// # Returns
/// The parsed date, or `None` when no format matches
#[must_use]
pub fn parse_sheet_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in SHEET_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    None
}

/// Parse a time cell, accepting `HH:MM`, `HH:MM:SS` and compact `HHMM`
#[must_use]
pub fn parse_sheet_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.contains(':') {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() < 2 {
            return None;
        }
        let hours: u32 = parts[0].trim().parse().ok()?;
        let minutes: u32 = parts[1].trim().parse().ok()?;
        return NaiveTime::from_hms_opt(hours, minutes, 0);
    }

    if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
        let hours: u32 = value[..2].parse().ok()?;
        let minutes: u32 = value[2..].parse().ok()?;
        return NaiveTime::from_hms_opt(hours, minutes, 0);
    }

    None
}

/// Check that a text is a well-formed `HH:MM` time
#[must_use]
pub fn valid_time_text(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 2 {
        return false;
    }

    let (Ok(hours), Ok(minutes)) = (parts[0].parse::<i32>(), parts[1].parse::<i32>()) else {
        return false;
    };

    (0..=23).contains(&hours) && (0..=59).contains(&minutes)
}

/// Convert a spreadsheet serial number to a date
///
/// Serials count days from 1899-12-30; fractional parts (time of day) are
/// dropped. Out-of-range serials return `None`.
#[must_use]
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }

    let (y, m, d) = SERIAL_EPOCH;
    let base = NaiveDate::from_ymd_opt(y, m, d)?;
    base.checked_add_days(Days::new(serial.trunc() as u64))
}

/// Convert a date back to its spreadsheet serial number
#[must_use]
pub fn serial_from_date(date: NaiveDate) -> Option<i64> {
    let (y, m, d) = SERIAL_EPOCH;
    let base = NaiveDate::from_ymd_opt(y, m, d)?;
    Some((date - base).num_days())
}

/// Convert the fractional part of a spreadsheet serial to a time of day
#[must_use]
pub fn time_from_serial(serial: f64) -> Option<NaiveTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let seconds = (serial.fract() * 86_400.0).round() as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)
}
