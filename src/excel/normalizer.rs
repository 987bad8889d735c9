//! Cell normalization: ambiguous spreadsheet cells in, canonical strings out.
//!
//! Every function here is total. A cell that cannot be understood becomes
//! an empty string instead of an error so one bad cell never aborts a row.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{CellValue, DateEpoch};

/// Leave/absence codes accepted in the time-in column
pub const LEAVE_CODES: [&str; 10] = ["PN", "1/2PN", "KL", "KP", "TS", "PO", "TN", "PC", "PT", "DS"];

/// Largest serial the 1900 scheme can express (9999-12-31)
const MAX_SERIAL_1900: i64 = 2_958_465;

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})(?:$|[T\s])").expect("valid regex"));
static DMY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{4})(?:$|\s)").expect("valid regex"));
static DAY_MONTH_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-([A-Za-z]{3})-(\d{2})$").expect("valid regex"));
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("valid regex"));

/// What a time-in value turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInKind {
    Empty,
    Clock,
    Leave,
    Other,
}

/// Normalize a date cell into `YYYY-MM-DD`, or `""` when it cannot be read
pub fn normalize_date(cell: &CellValue, epoch: DateEpoch) -> String {
    match cell {
        CellValue::Number(n) => serial_to_ymd(*n, epoch)
            .map(|(y, m, d)| format_ymd(y, m, d))
            .unwrap_or_default(),
        CellValue::DateTime(dt) => {
            let date = dt.date();
            format_ymd(date.year(), date.month(), date.day())
        }
        CellValue::Text(s) => parse_date_text(s).unwrap_or_default(),
        CellValue::Empty | CellValue::Boolean(_) | CellValue::Error(_) => String::new(),
    }
}

/// Decode a spreadsheet serial number into a (year, month, day) triple.
///
/// The 1900 scheme keeps the historical leap-day bug: serial 60 is
/// 1900-02-29, a date that never existed, and serials before it are
/// shifted by one day relative to the ones after it.
pub fn serial_to_ymd(serial: f64, epoch: DateEpoch) -> Option<(i32, u32, u32)> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor();
    if days > MAX_SERIAL_1900 as f64 {
        return None;
    }
    let days = days as i64;

    let date = match epoch {
        DateEpoch::Epoch1900 => {
            if days < 1 {
                return None;
            }
            if days == 60 {
                return Some((1900, 2, 29));
            }
            let base = if days < 60 {
                NaiveDate::from_ymd_opt(1899, 12, 31)?
            } else {
                NaiveDate::from_ymd_opt(1899, 12, 30)?
            };
            base.checked_add_signed(Duration::days(days))?
        }
        DateEpoch::Epoch1904 => {
            if days < 0 {
                return None;
            }
            NaiveDate::from_ymd_opt(1904, 1, 1)?.checked_add_signed(Duration::days(days))?
        }
    };

    if date.year() > 9999 {
        return None;
    }
    Some((date.year(), date.month(), date.day()))
}

/// Try the accepted textual date layouts in order; first match wins
pub fn parse_date_text(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DATE.captures(text) {
        return checked_ymd(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = DMY_DATE.captures(text) {
        return checked_ymd(&caps[3], &caps[2], &caps[1]);
    }

    if let Some(caps) = DAY_MONTH_NAME.captures(text) {
        let month = month_from_abbrev(&caps[2])?;
        let yy: i32 = caps[3].parse().ok()?;
        let year = if yy < 70 { 2000 + yy } else { 1900 + yy };
        let day: u32 = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(|_| format_ymd(year, month, day));
    }

    None
}

/// Normalize a clock column (time-in / time-out).
///
/// Day fractions and native date-times become `HH:MM` (or `HH:MM:SS` when
/// seconds are present), leave codes are upper-cased, anything else is
/// returned trimmed so that the caller can decide what to do with it.
pub fn normalize_clock(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty | CellValue::Boolean(_) | CellValue::Error(_) => String::new(),
        CellValue::Number(n) => fraction_to_clock(*n).unwrap_or_default(),
        CellValue::DateTime(dt) => format_clock(dt.time()),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            match leave_code(trimmed) {
                Some(code) => code.to_string(),
                None => trimmed.to_string(),
            }
        }
    }
}

/// Match a leave/absence code case-insensitively, returning its canonical form
pub fn leave_code(value: &str) -> Option<&'static str> {
    let value = value.trim();
    LEAVE_CODES
        .iter()
        .copied()
        .find(|code| code.eq_ignore_ascii_case(value))
}

/// True for `H:MM` or `H:MM:SS` with a valid hour/minute/second
pub fn is_clock_time(value: &str) -> bool {
    let Some(caps) = CLOCK.captures(value.trim()) else {
        return false;
    };
    let hour: u32 = caps[1].parse().unwrap_or(99);
    let minute: u32 = caps[2].parse().unwrap_or(99);
    let second: u32 = caps.get(3).and_then(|s| s.as_str().parse().ok()).unwrap_or(0);
    hour < 24 && minute < 60 && second < 60
}

pub fn classify_time_in(value: &str) -> TimeInKind {
    let value = value.trim();
    if value.is_empty() {
        TimeInKind::Empty
    } else if LEAVE_CODES.contains(&value) {
        TimeInKind::Leave
    } else if is_clock_time(value) {
        TimeInKind::Clock
    } else {
        TimeInKind::Other
    }
}

fn fraction_to_clock(value: f64) -> Option<String> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let fraction = value.fract();
    // A whole number is a date, not a time of day
    if fraction == 0.0 && value >= 1.0 {
        return None;
    }
    let total_seconds = (fraction * 86_400.0).round() as u32 % 86_400;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(total_seconds, 0)?;
    Some(format_clock(time))
}

fn format_clock(time: NaiveTime) -> String {
    if time.second() == 0 {
        format!("{:02}:{:02}", time.hour(), time.minute())
    } else {
        format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second())
    }
}

fn checked_ymd(year: &str, month: &str, day: &str) -> Option<String> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|_| format_ymd(year, month, day))
}

fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = abbrev.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == lower).map(|i| i as u32 + 1)
}

fn format_ymd(year: i32, month: u32, day: u32) -> String {
    format!("{:04}-{:02}-{:02}", year, month, day)
}
