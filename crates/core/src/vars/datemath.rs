//! Date-time variable evaluation.
//!
//! Recognises two roots, the captured "now" instant (`YP_TIME_NOW`) and the
//! configured reference instant (`YP_TIME_REF`). The remainder of the name
//! is an ordered sequence of suffix operations:
//!
//! - `_PLUS_<duration>` / `_MINUS_<duration>`: calendar-aware offsets,
//!   applied strictly left to right.
//! - `_AT_<duration>`: set the named fields to absolute values, leaving
//!   absent fields unchanged.
//! - `_FORMAT_<name>`: terminal; selects a named output format.
//!
//! Duration tokens use the `nYnMnDTnHnMnS` grammar: every quantity is
//! optional, `T` separates the date part from the time part and is required
//! only when a time component is present (e.g. `1DT2H` is one day and two
//! hours).

use std::collections::HashMap;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike,
};
use thiserror::Error;

/// Root of the "now" instant variable family.
pub const TIME_NOW_PREFIX: &str = "YP_TIME_NOW";

/// Root of the reference-instant variable family.
pub const TIME_REF_PREFIX: &str = "YP_TIME_REF";

/// Render pattern used when the format table has no default entry.
pub const DEFAULT_TIME_FORMAT: &str = "%FT%T%:z";

/// Error type for date-time suffix parsing and evaluation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateMathError {
    #[error("invalid suffix sequence: {0}")]
    InvalidSuffix(String),

    #[error("invalid duration token: {0}")]
    InvalidDuration(String),

    #[error("date-time field out of range: {0}")]
    FieldOutOfRange(String),

    #[error("unknown time format name: {0}")]
    UnknownFormat(String),

    #[error("unrecognised date-time value: {0}")]
    InvalidInstant(String),
}

/// Quantities named by one duration token. `None` means the field was
/// absent, which matters for `_AT_` (absent fields are left unchanged).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationFields {
    pub years: Option<u32>,
    pub months: Option<u32>,
    pub days: Option<u32>,
    pub hours: Option<u32>,
    pub minutes: Option<u32>,
    pub seconds: Option<u32>,
}

/// One parsed suffix operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOp {
    Plus(DurationFields),
    Minus(DurationFields),
    At(DurationFields),
}

/// A fully parsed suffix sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeExpr {
    pub ops: Vec<TimeOp>,
    pub format: Option<String>,
}

/// Evaluate a time-variable name against the given instants.
///
/// Returns `None` when `name` does not start with either recognised root
/// (or the remainder does not look like a suffix sequence at all), so the
/// caller can treat it as an ordinary, possibly unbound, variable.
pub fn evaluate(
    name: &str,
    now: DateTime<FixedOffset>,
    time_ref: DateTime<FixedOffset>,
    formats: &HashMap<String, String>,
) -> Option<Result<String, DateMathError>> {
    let (base, tail) = if let Some(tail) = name.strip_prefix(TIME_NOW_PREFIX) {
        (now, tail)
    } else if let Some(tail) = name.strip_prefix(TIME_REF_PREFIX) {
        (time_ref, tail)
    } else {
        return None;
    };
    // A name like YP_TIME_NOWHERE is not a time variable.
    if !tail.is_empty() && !tail.starts_with('_') {
        return None;
    }
    Some(evaluate_tail(base, tail, formats))
}

fn evaluate_tail(
    base: DateTime<FixedOffset>,
    tail: &str,
    formats: &HashMap<String, String>,
) -> Result<String, DateMathError> {
    let expr = parse_suffix(tail)?;
    let mut instant = base;
    for op in &expr.ops {
        instant = apply(instant, op)?;
    }
    let pattern: &str = match &expr.format {
        Some(name) => formats
            .get(name.as_str())
            .map(String::as_str)
            .ok_or_else(|| DateMathError::UnknownFormat(name.clone()))?,
        None => formats
            .get("")
            .map(String::as_str)
            .unwrap_or(DEFAULT_TIME_FORMAT),
    };
    Ok(strftime_with_colon_z(&instant, pattern))
}

/// Parse the suffix sequence after a recognised root, e.g.
/// `_AT_1DT0H0M0S_MINUS_T12H_FORMAT_ABBR`.
pub fn parse_suffix(tail: &str) -> Result<TimeExpr, DateMathError> {
    let mut ops = Vec::new();
    let mut format = None;
    let mut rest = tail;
    while !rest.is_empty() {
        if let Some(name) = rest.strip_prefix("_FORMAT_") {
            // Terminal: the rest of the name is the format key.
            if name.is_empty()
                || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
            {
                return Err(DateMathError::InvalidSuffix(tail.to_string()));
            }
            format = Some(name.to_string());
            rest = "";
        } else if let Some(after) = rest.strip_prefix("_PLUS_") {
            let (fields, remaining) = parse_duration(after)?;
            ops.push(TimeOp::Plus(fields));
            rest = remaining;
        } else if let Some(after) = rest.strip_prefix("_MINUS_") {
            let (fields, remaining) = parse_duration(after)?;
            ops.push(TimeOp::Minus(fields));
            rest = remaining;
        } else if let Some(after) = rest.strip_prefix("_AT_") {
            let (fields, remaining) = parse_duration(after)?;
            ops.push(TimeOp::At(fields));
            rest = remaining;
        } else {
            return Err(DateMathError::InvalidSuffix(tail.to_string()));
        }
    }
    Ok(TimeExpr { ops, format })
}

fn take_uint(s: &str) -> Option<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    s[..end].parse().ok().map(|n| (n, &s[end..]))
}

/// Parse one `nYnMnDTnHnMnS` token; returns the fields and the unconsumed
/// remainder of the name (starting at the next `_`, or empty).
fn parse_duration(input: &str) -> Result<(DurationFields, &str), DateMathError> {
    let mut fields = DurationFields::default();
    let mut rest = input;
    let mut seen = false;
    while let Some((n, after)) = take_uint(rest) {
        let unit = after
            .chars()
            .next()
            .ok_or_else(|| DateMathError::InvalidDuration(input.to_string()))?;
        match unit {
            'Y' => fields.years = Some(n),
            'M' => fields.months = Some(n),
            'D' => fields.days = Some(n),
            _ => return Err(DateMathError::InvalidDuration(input.to_string())),
        }
        seen = true;
        rest = &after[1..];
    }
    if let Some(after_t) = rest.strip_prefix('T') {
        rest = after_t;
        let mut seen_time = false;
        while let Some((n, after)) = take_uint(rest) {
            let unit = after
                .chars()
                .next()
                .ok_or_else(|| DateMathError::InvalidDuration(input.to_string()))?;
            match unit {
                'H' => fields.hours = Some(n),
                'M' => fields.minutes = Some(n),
                'S' => fields.seconds = Some(n),
                _ => return Err(DateMathError::InvalidDuration(input.to_string())),
            }
            seen_time = true;
            rest = &after[1..];
        }
        if !seen_time {
            return Err(DateMathError::InvalidDuration(input.to_string()));
        }
        seen = true;
    }
    if !seen {
        return Err(DateMathError::InvalidDuration(input.to_string()));
    }
    Ok((fields, rest))
}

/// Apply one suffix operation to an instant.
pub fn apply(
    instant: DateTime<FixedOffset>,
    op: &TimeOp,
) -> Result<DateTime<FixedOffset>, DateMathError> {
    match op {
        TimeOp::Plus(fields) => shift(instant, fields, 1),
        TimeOp::Minus(fields) => shift(instant, fields, -1),
        TimeOp::At(fields) => pin(instant, fields),
    }
}

fn shift(
    instant: DateTime<FixedOffset>,
    fields: &DurationFields,
    sign: i64,
) -> Result<DateTime<FixedOffset>, DateMathError> {
    let months = i64::from(fields.years.unwrap_or(0)) * 12
        + i64::from(fields.months.unwrap_or(0));
    let mut naive = instant.naive_local();
    if months != 0 {
        naive = NaiveDateTime::new(add_months(naive.date(), sign * months), naive.time());
    }
    let delta = Duration::days(i64::from(fields.days.unwrap_or(0)))
        + Duration::hours(i64::from(fields.hours.unwrap_or(0)))
        + Duration::minutes(i64::from(fields.minutes.unwrap_or(0)))
        + Duration::seconds(i64::from(fields.seconds.unwrap_or(0)));
    naive += delta * (sign as i32);
    rebuild(*instant.offset(), naive)
}

fn pin(
    instant: DateTime<FixedOffset>,
    fields: &DurationFields,
) -> Result<DateTime<FixedOffset>, DateMathError> {
    let date = instant.date_naive();
    let time = instant.time();
    let year = fields.years.map_or_else(|| date.year(), |y| y as i32);
    let month = fields.months.unwrap_or_else(|| date.month());
    if month == 0 || month > 12 {
        return Err(DateMathError::FieldOutOfRange(format!("month {month}")));
    }
    let day = fields.days.unwrap_or_else(|| date.day());
    if day == 0 {
        return Err(DateMathError::FieldOutOfRange("day 0".to_string()));
    }
    // Setting the month may invalidate the inherited day-of-month.
    let day = day.min(days_in_month(year, month));
    let hour = fields.hours.unwrap_or_else(|| time.hour());
    let minute = fields.minutes.unwrap_or_else(|| time.minute());
    let second = fields.seconds.unwrap_or_else(|| time.second());
    let new_date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateMathError::FieldOutOfRange(format!("{year}-{month}-{day}")))?;
    let new_time = NaiveTime::from_hms_nano_opt(hour, minute, second, time.nanosecond())
        .ok_or_else(|| {
            DateMathError::FieldOutOfRange(format!("{hour}:{minute}:{second}"))
        })?;
    rebuild(*instant.offset(), NaiveDateTime::new(new_date, new_time))
}

fn rebuild(
    offset: FixedOffset,
    naive: NaiveDateTime,
) -> Result<DateTime<FixedOffset>, DateMathError> {
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| DateMathError::FieldOutOfRange(naive.to_string()))
}

fn add_months(date: NaiveDate, months: i64) -> NaiveDate {
    let year = i64::from(date.year());
    let month = i64::from(date.month());
    let day = date.day();

    let total_months = year * 12 + month - 1 + months;
    let new_year = total_months.div_euclid(12) as i32;
    let new_month = (total_months.rem_euclid(12) + 1) as u32;

    // The target month may be shorter than the starting day allows.
    let new_day = day.min(days_in_month(new_year, new_month));

    NaiveDate::from_ymd_opt(new_year, new_month, new_day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// Render an instant, supporting the `%:z`, `%::z` and `%:::z` offset codes
/// and always using `Z` for UTC with every numeric timezone code.
///
/// The offset codes are rendered by hand: `%:::z` is the `%::z` form with
/// trailing `:00` groups trimmed, so `-09:45` stays `-09:45` rather than
/// collapsing to the whole hour.
pub fn strftime_with_colon_z(instant: &DateTime<FixedOffset>, pattern: &str) -> String {
    let total = instant.offset().local_minus_utc();
    let (plain, colon_1, colon_2, colon_3) = if total == 0 {
        ("Z".to_string(), "Z".to_string(), "Z".to_string(), "Z".to_string())
    } else {
        let sign = if total < 0 { '-' } else { '+' };
        let total = total.unsigned_abs();
        let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
        let colon_2 = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
        let mut colon_3 = colon_2.as_str();
        while let Some(trimmed) = colon_3.strip_suffix(":00") {
            colon_3 = trimmed;
        }
        (
            format!("{sign}{hours:02}{minutes:02}"),
            format!("{sign}{hours:02}:{minutes:02}"),
            colon_2.clone(),
            colon_3.to_string(),
        )
    };
    let pattern = pattern
        .replace("%:::z", &colon_3)
        .replace("%::z", &colon_2)
        .replace("%:z", &colon_1)
        .replace("%z", &plain);
    instant.format(&pattern).to_string()
}

/// Parse a configured instant (the reference time). Accepts RFC 3339, the
/// minute-precision shorthand (`2022-02-20T22:02Z`), zone-less date-times
/// (assumed UTC), and bare dates (UTC midnight).
pub fn parse_instant(text: &str) -> Result<DateTime<FixedOffset>, DateMathError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant);
    }
    if let Some(naive_part) = text.strip_suffix('Z') {
        for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(naive_part, pattern) {
                return Ok(naive.and_utc().fixed_offset());
            }
        }
    }
    for pattern in ["%Y-%m-%dT%H:%M%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(instant) = DateTime::parse_from_str(text, pattern) {
            return Ok(instant);
        }
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }
    Err(DateMathError::InvalidInstant(text.to_string()))
}
