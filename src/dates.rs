//! Date parsing for front matter and book configs.
//!
//! Writers type dates by hand, so every date field accepts a cascade of
//! formats, tried in order until one parses:
//!
//! - `2024` → 2024-01-01 00:00 UTC
//! - `2024-03` → 2024-03-01 00:00 UTC
//! - `2024-03-09` → midnight UTC
//! - `2024-03-09 18:30` / `2024-03-09T18:30` → UTC
//! - `2024-03-09 18:30:15` / `2024-03-09T18:30:15` → UTC
//! - any of the time forms followed by `Z` or `±HH:MM` → that offset
//!
//! RFC 3339 with fractional seconds (what TOML datetimes stringify to) is
//! accepted as well. YAML and TOML integers are treated as a bare year.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Human-readable list of accepted layouts, used in error messages.
pub const ACCEPTED_FORMATS: &[&str] = &[
    "YYYY",
    "YYYY-MM",
    "YYYY-MM-DD",
    "YYYY-MM-DD HH:MM",
    "YYYY-MM-DDTHH:MM",
    "YYYY-MM-DD HH:MM:SS",
    "YYYY-MM-DDTHH:MM:SS",
    "any time form + Z or ±HH:MM",
];

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unrecognized date {value:?}, expected one of: {}", ACCEPTED_FORMATS.join(", "))]
pub struct DateError {
    pub value: String,
}

/// A date as it appears in a config bag: quoted text or a bare year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Year(i64),
    Text(String),
}

impl DateInput {
    pub fn resolve(&self) -> Result<DateTime<FixedOffset>, DateError> {
        match self {
            DateInput::Year(year) => parse_date(&year.to_string()),
            DateInput::Text(text) => parse_date(text),
        }
    }
}

/// Parse a date string through the format cascade.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let s = value.trim();
    let fail = || DateError {
        value: value.to_string(),
    };

    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s.parse().map_err(|_| fail())?;
        let date = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(fail)?;
        return Ok(midnight_utc(date));
    }
    if s.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Ok(midnight_utc(date));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(midnight_utc(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }

    let with_offset = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => s.to_string(),
    };
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, layout) {
            return Ok(dt);
        }
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    Err(fail())
}

fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_time(NaiveTime::default()).and_utc().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(value: &str) -> String {
        parse_date(value).unwrap().to_rfc3339()
    }

    #[test]
    fn year_only() {
        assert_eq!(ymd_hms("2024"), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn year_month() {
        assert_eq!(ymd_hms("2024-03"), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn full_date() {
        assert_eq!(ymd_hms("2024-03-09"), "2024-03-09T00:00:00+00:00");
    }

    #[test]
    fn space_and_t_separators() {
        assert_eq!(ymd_hms("2024-03-09 18:30"), "2024-03-09T18:30:00+00:00");
        assert_eq!(ymd_hms("2024-03-09T18:30"), "2024-03-09T18:30:00+00:00");
        assert_eq!(ymd_hms("2024-03-09 18:30:15"), "2024-03-09T18:30:15+00:00");
        assert_eq!(ymd_hms("2024-03-09T18:30:15"), "2024-03-09T18:30:15+00:00");
    }

    #[test]
    fn explicit_offsets() {
        assert_eq!(
            ymd_hms("2024-03-09T18:30:15+02:00"),
            "2024-03-09T18:30:15+02:00"
        );
        assert_eq!(ymd_hms("2024-03-09 18:30-05:00"), "2024-03-09T18:30:00-05:00");
        assert_eq!(ymd_hms("2024-03-09 18:30Z"), "2024-03-09T18:30:00+00:00");
    }

    #[test]
    fn fractional_rfc3339() {
        assert_eq!(
            ymd_hms("2024-03-09T18:30:15.250Z"),
            "2024-03-09T18:30:15.250+00:00"
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(ymd_hms("  2024-03-09 "), "2024-03-09T00:00:00+00:00");
    }

    #[test]
    fn garbage_lists_formats() {
        let err = parse_date("next tuesday").unwrap_err();
        assert_eq!(err.value, "next tuesday");
        let msg = err.to_string();
        assert!(msg.contains("YYYY-MM-DD"), "{msg}");
        assert!(msg.contains("next tuesday"), "{msg}");
    }

    #[test]
    fn invalid_calendar_date_fails() {
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("2024-13").is_err());
    }

    #[test]
    fn integer_year_input() {
        let date = DateInput::Year(1999).resolve().unwrap();
        assert_eq!(date.to_rfc3339(), "1999-01-01T00:00:00+00:00");
    }
}
