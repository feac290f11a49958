//! Date/time normalization for statement rows.
//!
//! Timestamps are kept exactly as the statement prints them: everything here
//! works on naive values and no timezone is ever applied.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use statera_core::config::{DateInput, DateParseConfig};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Date string cannot be empty")]
    Blank,
    #[error("Unable to parse date: '{0}'")]
    Unparseable(String),
    #[error("Unable to parse time: '{0}'")]
    UnparseableTime(String),
}

/// Date-time patterns tried (in order) by [`parse_statement_datetime`].
const DATETIME_FORMATS: &[&str] = &[
    "%d-%b-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%d-%b-%YT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Date-only patterns; the time defaults to midnight.
const DATE_FORMATS: &[&str] = &["%d-%b-%Y", "%d/%m/%Y", "%d %b %Y", "%d-%m-%Y", "%Y-%m-%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

const DISPLAY_DATETIME: &str = "%d-%b-%Y %H:%M:%S";
const DISPLAY_DATE: &str = "%d-%b-%Y";

/// Last serial day Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Resolves the date and time tokens of a row into one naive timestamp.
#[derive(Debug, Clone)]
pub struct DateTimeResolver {
    input: DateInput,
    date_format: String,
    time_format: String,
    time_in_date_field: bool,
}

impl Default for DateTimeResolver {
    fn default() -> Self {
        Self::new(&DateParseConfig::default())
    }
}

impl DateTimeResolver {
    pub fn new(cfg: &DateParseConfig) -> Self {
        Self {
            input: cfg.input,
            date_format: to_chrono_pattern(&cfg.format),
            time_format: to_chrono_pattern(&cfg.time_format),
            time_in_date_field: cfg.with_time_in_same_field,
        }
    }

    /// A missing date token means today; a missing time token means midnight.
    pub fn resolve(&self, date: Option<&str>, time: Option<&str>) -> Result<NaiveDateTime, DateError> {
        let date = date.map(str::trim).filter(|s| !s.is_empty());
        let time = time.map(str::trim).filter(|s| !s.is_empty());

        if self.input == DateInput::ExcelSerial {
            if let Some(dt) = date
                .and_then(|d| d.parse::<f64>().ok())
                .and_then(excel_serial_to_datetime)
            {
                return Ok(dt);
            }
        }

        let Some(date) = date else {
            let today = Local::now().date_naive();
            return Ok(today.and_time(self.resolve_time(time)?));
        };

        if self.time_in_date_field {
            if let Ok(dt) = NaiveDateTime::parse_from_str(date, &self.date_format) {
                return Ok(dt);
            }
        }

        if let Ok(d) = NaiveDate::parse_from_str(date, &self.date_format) {
            return Ok(d.and_time(self.resolve_time(time)?));
        }

        // Spreadsheet date cells and unusual exports land here.
        let fallback = parse_statement_datetime(date)?;
        match time {
            Some(_) => Ok(fallback.date().and_time(self.resolve_time(time)?)),
            None => Ok(fallback),
        }
    }

    fn resolve_time(&self, time: Option<&str>) -> Result<NaiveTime, DateError> {
        let Some(time) = time else {
            return Ok(NaiveTime::MIN);
        };
        std::iter::once(self.time_format.as_str())
            .chain(TIME_FORMATS.iter().copied())
            .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())
            .ok_or_else(|| DateError::UnparseableTime(time.to_string()))
    }
}

/// Convert an Excel serial day number (1900 date system) to a naive timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.trunc();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    epoch
        .checked_add_signed(Duration::days(days as i64))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Strict parse of a free-standing statement date, trying the common
/// date-time layouts first and then date-only layouts (midnight).
pub fn parse_statement_datetime(input: &str) -> Result<NaiveDateTime, DateError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DateError::Blank);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Ok(dt);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
        .ok_or_else(|| DateError::Unparseable(s.to_string()))
}

pub fn parse_statement_date(input: &str) -> Result<NaiveDate, DateError> {
    parse_statement_datetime(input).map(|dt| dt.date())
}

/// `21-Nov-2025 14:30:00`
pub fn format_statement_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DISPLAY_DATETIME).to_string()
}

/// `21-Nov-2025`
pub fn format_statement_date(dt: &NaiveDateTime) -> String {
    dt.format(DISPLAY_DATE).to_string()
}

pub fn has_time_component(dt: &NaiveDateTime) -> bool {
    dt.time() != NaiveTime::MIN
}

pub fn normalize_to_midnight(dt: &NaiveDateTime) -> NaiveDateTime {
    dt.date().and_time(NaiveTime::MIN)
}

/// Translate a `dd/MM/yyyy HH:mm:ss` style pattern into a chrono format string.
/// Patterns that already contain `%` are returned unchanged.
pub fn to_chrono_pattern(pattern: &str) -> String {
    if pattern.contains('%') {
        return pattern.to_string();
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is a literal quote; otherwise copy until the closing quote.
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                out.push(chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let token = match (c, run) {
            ('y', 2) => Some("%y".to_string()),
            ('y', _) | ('u', _) => Some("%Y".to_string()),
            ('M', 1 | 2) => Some("%m".to_string()),
            ('M', 3) => Some("%b".to_string()),
            ('M', _) => Some("%B".to_string()),
            ('d', _) => Some("%d".to_string()),
            ('H', _) => Some("%H".to_string()),
            ('h', _) => Some("%I".to_string()),
            ('m', _) => Some("%M".to_string()),
            ('s', _) => Some("%S".to_string()),
            ('S', n @ (3 | 6 | 9)) => Some(format!("%{n}f")),
            ('S', _) => Some("%f".to_string()),
            ('a', _) => Some("%p".to_string()),
            ('E', 1..=3) => Some("%a".to_string()),
            ('E', _) => Some("%A".to_string()),
            _ => None,
        };
        match token {
            Some(t) => out.push_str(&t),
            None => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
        i += run;
    }
    out
}
