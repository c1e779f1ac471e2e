//! Date recognition and canonical ISO-8601 normalization.
//!
//! Accepted spellings:
//!
//! - ISO: `YYYY-MM-DD`, optionally followed by `THH:mm[:ss[.sss]]` (or a space
//!   instead of `T`) and a `Z` or `±HH:MM` offset
//! - two-digit year: `YY-MM-DD`
//! - European: `DD-MM-YYYY` / `DD-MM-YY` with `-`, `.` or `/` separators
//!
//! The non-ISO forms accept an optional time suffix. Two-digit years mean 2000+N.
//! Timestamps without an offset are read as UTC.
//!
//! Cells read for merging ([`parse_date_value`]) also accept the looser
//! spellings in [`LOOSE_DATETIME_FORMATS`] and [`LOOSE_DATE_FORMATS`], such as
//! `2024/01/15`, `01/15/2024` and `Jan 15, 2024`. Column detection stays on the
//! narrow grammar above.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?)?\s*(Z|[+-]\d{2}:?\d{2})?$",
    )
    .unwrap()
});

static SHORT_YEAR_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})-(\d{1,2})-(\d{1,2})(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?)?$")
        .unwrap()
});

static EUROPEAN_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{1,2})([-./])(\d{1,2})([-./])(\d{4}|\d{2})(?:[T ,]\s*(\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?)?$",
    )
    .unwrap()
});

/// Extra date-time spellings accepted when reading mapped cells.
pub const LOOSE_DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
    "%d %b %Y %H:%M:%S",
];

/// Extra date-only spellings accepted when reading mapped cells.
pub const LOOSE_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%Y.%m.%d",
];

/// Which spelling a date string used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYY-MM-DD[THH:mm:ss[.sss]][Z]`
    Iso,
    /// `YY-MM-DD`
    ShortYear,
    /// `DD-MM-YYYY` or `DD-MM-YY`, any of `-./`
    European,
    /// Anything else chrono understands (RFC 2822, RFC 3339 with offset).
    Other,
}

impl DateFormat {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DateFormat::Iso => "ISO 8601",
            DateFormat::ShortYear => "YY-MM-DD",
            DateFormat::European => "DD-MM-YYYY",
            DateFormat::Other => "other",
        }
    }
}

/// Parse a date string into a UTC instant, reporting which spelling matched.
pub fn parse_date_string_with_format(input: &str) -> Option<(DateTime<Utc>, DateFormat)> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DATE.captures(s) {
        let date = NaiveDate::from_ymd_opt(num(&caps, 1)?, num(&caps, 2)?, num(&caps, 3)?)?;
        let naive = date.and_time(time_from(&caps, 4)?);
        let instant = apply_offset(naive, caps.get(8).map(|m| m.as_str()))?;
        return Some((instant, DateFormat::Iso));
    }

    if let Some(caps) = SHORT_YEAR_DATE.captures(s) {
        let short = NaiveDate::from_ymd_opt(2000 + num::<i32>(&caps, 1)?, num(&caps, 2)?, num(&caps, 3)?);
        if let Some(date) = short {
            let naive = date.and_time(time_from(&caps, 4)?);
            return Some((naive.and_utc(), DateFormat::ShortYear));
        }
    }

    if let Some(caps) = EUROPEAN_DATE.captures(s) {
        // Mixed separators are not a date.
        if caps[2] != caps[4] {
            return None;
        }
        let year_text = &caps[5];
        let mut year: i32 = year_text.parse().ok()?;
        if year_text.len() == 2 {
            year += 2000;
        }
        let date = NaiveDate::from_ymd_opt(year, num(&caps, 3)?, num(&caps, 1)?)?;
        let naive = date.and_time(time_from(&caps, 6)?);
        return Some((naive.and_utc(), DateFormat::European));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some((dt.with_timezone(&Utc), DateFormat::Other));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some((dt.with_timezone(&Utc), DateFormat::Other));
    }

    None
}

/// Parse a date string into a UTC instant.
pub fn parse_date_string(input: &str) -> Option<DateTime<Utc>> {
    parse_date_string_with_format(input).map(|(dt, _)| dt)
}

/// Whether a string is a recognizable date.
pub fn is_valid_date_string(input: &str) -> bool {
    parse_date_string(input).is_some()
}

/// Normalize a date string to the canonical ISO form used as merge key.
pub fn normalize_to_iso_date(input: &str) -> Option<String> {
    parse_date_string(input).map(|dt| to_iso_key(&dt))
}

/// Parse a date string with the narrow grammar, then the loose spellings.
pub fn parse_lenient_date_string(input: &str) -> Option<DateTime<Utc>> {
    parse_date_string(input).or_else(|| parse_loose(input.trim()))
}

/// Parse any cell as a date: strings leniently, numbers as epoch milliseconds.
pub fn parse_date_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_lenient_date_string(s),
        Value::Number(n) => {
            let millis = n.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(millis.trunc() as i64)
        }
        _ => None,
    }
}

/// Canonical key: `YYYY-MM-DDTHH:mm:ss.sssZ`.
pub fn to_iso_key(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn parse_loose(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    LOOSE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            LOOSE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

/// Time-of-day from capture groups `start..start+3` (hour, minute, second, fraction).
fn time_from(caps: &Captures<'_>, start: usize) -> Option<NaiveTime> {
    let Some(hour) = caps.get(start) else {
        return NaiveTime::from_hms_opt(0, 0, 0);
    };
    let hour: u32 = hour.as_str().parse().ok()?;
    let minute: u32 = num(caps, start + 1)?;
    let second: u32 = caps
        .get(start + 2)
        .map(|m| m.as_str().parse().ok())
        .unwrap_or(Some(0))?;
    let nanos = match caps.get(start + 3) {
        Some(frac) => {
            let digits = frac.as_str();
            let padded = format!("{:0<9}", digits);
            padded[..9].parse::<u32>().ok()?
        }
        None => 0,
    };
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

fn apply_offset(naive: NaiveDateTime, offset: Option<&str>) -> Option<DateTime<Utc>> {
    match offset {
        None | Some("Z") => Some(naive.and_utc()),
        Some(raw) => {
            let sign = if raw.starts_with('-') { -1 } else { 1 };
            let digits: String = raw[1..].chars().filter(|c| *c != ':').collect();
            let hours: i32 = digits.get(..2)?.parse().ok()?;
            let minutes: i32 = digits.get(2..4)?.parse().ok()?;
            let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso_variants() {
        assert_eq!(
            normalize_to_iso_date("2025-11-27T23:02:59.000Z").as_deref(),
            Some("2025-11-27T23:02:59.000Z")
        );
        assert_eq!(
            normalize_to_iso_date("2024-01-01").as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
        assert_eq!(
            normalize_to_iso_date("2024-01-01 10:30").as_deref(),
            Some("2024-01-01T10:30:00.000Z")
        );
        assert_eq!(
            normalize_to_iso_date("2024-01-01T12:00:00+02:00").as_deref(),
            Some("2024-01-01T10:00:00.000Z")
        );
    }

    #[test]
    fn test_short_year() {
        let (dt, format) = parse_date_string_with_format("24-03-15").unwrap();
        assert_eq!(to_iso_key(&dt), "2024-03-15T00:00:00.000Z");
        assert_eq!(format, DateFormat::ShortYear);
    }

    #[test]
    fn test_european_separators() {
        for input in ["15-03-2024", "15.03.2024", "15/03/2024", "15.03.24"] {
            let (dt, format) = parse_date_string_with_format(input).unwrap();
            assert_eq!(to_iso_key(&dt), "2024-03-15T00:00:00.000Z", "{}", input);
            assert_eq!(format, DateFormat::European);
        }
        assert_eq!(
            normalize_to_iso_date("15.03.2024 08:15:30").as_deref(),
            Some("2024-03-15T08:15:30.000Z")
        );
    }

    #[test]
    fn test_two_digit_dash_falls_back_to_european() {
        // 2015-02-30 does not exist, so read as DD-MM-YY.
        assert_eq!(
            normalize_to_iso_date("15-02-30").as_deref(),
            Some("2030-02-15T00:00:00.000Z")
        );
    }

    #[test]
    fn test_rejects_non_dates() {
        assert!(!is_valid_date_string(""));
        assert!(!is_valid_date_string("hello"));
        assert!(!is_valid_date_string("78.92"));
        assert!(!is_valid_date_string("2024-13-01"));
        assert!(!is_valid_date_string("15-03/2024"));
        assert!(!is_valid_date_string("30"));
    }

    #[test]
    fn test_same_instant_same_key() {
        let a = normalize_to_iso_date("2024-01-01T00:00:00Z").unwrap();
        let b = normalize_to_iso_date("2024-01-01").unwrap();
        let c = normalize_to_iso_date("01.01.2024").unwrap();
        let d = normalize_to_iso_date("2024-01-01T01:00:00+01:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
    }

    #[test]
    fn test_mapped_cells_accept_loose_spellings() {
        for input in ["2024/01/15", "01/15/2024", "Jan 15, 2024", "15 January 2024", "2024.01.15"] {
            let dt = parse_date_value(&json!(input)).unwrap_or_else(|| panic!("{}", input));
            assert_eq!(to_iso_key(&dt), "2024-01-15T00:00:00.000Z", "{}", input);
        }
        let dt = parse_date_value(&json!("01/15/2024 06:30 PM")).unwrap();
        assert_eq!(to_iso_key(&dt), "2024-01-15T18:30:00.000Z");

        // Column detection keeps the narrow grammar.
        assert!(!is_valid_date_string("2024/01/15"));
        assert!(parse_date_value(&json!("soon")).is_none());
    }

    #[test]
    fn test_day_first_wins_when_ambiguous() {
        let dt = parse_date_value(&json!("03/04/2024")).unwrap();
        assert_eq!(to_iso_key(&dt), "2024-04-03T00:00:00.000Z");
    }

    #[test]
    fn test_parse_date_value_numbers_are_millis() {
        let dt = parse_date_value(&json!(0)).unwrap();
        assert_eq!(to_iso_key(&dt), "1970-01-01T00:00:00.000Z");
        assert!(parse_date_value(&json!(true)).is_none());
        assert!(parse_date_value(&Value::Null).is_none());
    }
}
