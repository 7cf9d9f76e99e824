//! Wikidata time value formatting
//!
//! Dump time values look like `+1879-03-14T00:00:00Z` with an integer
//! precision (0 = billion years … 14 = second) and a calendar model URI.
//! Julian dates in the common era with at most four-digit years are shifted
//! onto the Gregorian calendar by ordinal-day arithmetic before formatting.

use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TextifyError, TextifyResult};
use crate::locale::LocalePack;

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])(\d{1,16})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})Z$")
        .expect("time pattern is a valid literal")
});

/// Calendar model id of the proleptic Julian calendar
const JULIAN_CALENDAR: &str = "Q1985786";

/// Ordinal distance between 1582-10-15 and 1582-10-05, the edges of the
/// Gregorian reform gap
const JULIAN_GREGORIAN_SHIFT_DAYS: u64 = 10;

/// Format a dump time value under the given locale pack
///
/// # Errors
///
/// Returns [`TextifyError::Time`] when the time string does not match the
/// dump format, the precision is unknown, or a Julian date cannot be
/// represented.
pub fn time_to_text(
    time: &str,
    precision: u32,
    calendarmodel: &str,
    pack: &LocalePack,
) -> TextifyResult<String> {
    let captures = TIME_PATTERN
        .captures(time)
        .ok_or_else(|| TextifyError::time(format!("'{time}' does not match the dump format")))?;

    let sign = if &captures[1] == "-" { -1i64 } else { 1i64 };
    let mut year: i64 = captures[2]
        .parse()
        .map_err(|e| TextifyError::time(format!("year in '{time}': {e}")))?;
    year *= sign;

    let month_raw = &captures[3];
    let day_raw = &captures[4];
    let (hour, minute, second) = (&captures[5], &captures[6], &captures[7]);

    // Zero month/day mean "unspecified" and default to 1.
    let mut month: u32 = if month_raw == "00" {
        1
    } else {
        month_raw
            .parse()
            .map_err(|e| TextifyError::time(format!("month in '{time}': {e}")))?
    };
    let mut day: u32 = if day_raw == "00" {
        1
    } else {
        day_raw
            .parse()
            .map_err(|e| TextifyError::time(format!("day in '{time}': {e}")))?
    };

    // Julian dates after year 1 with at most four-digit years are shifted
    // onto the Gregorian calendar; anything else is taken as-is.
    if calendarmodel.contains(JULIAN_CALENDAR) && year > 1 && year <= 9999 {
        let julian = i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
            .ok_or_else(|| TextifyError::time(format!("invalid Julian date in '{time}'")))?;
        let gregorian = julian
            .checked_add_days(Days::new(JULIAN_GREGORIAN_SHIFT_DAYS))
            .ok_or_else(|| TextifyError::time(format!("Julian shift overflow in '{time}'")))?;
        year = i64::from(gregorian.year());
        month = gregorian.month();
        day = gregorian.day();
    }

    let month_name = *pack
        .months
        .get(month as usize - 1)
        .ok_or_else(|| TextifyError::time(format!("month {month} out of range in '{time}'")))?;
    let era = if year > 0 { pack.era_ad } else { pack.era_bc };

    let text = match precision {
        14 => format!("{year} {month_name} {day} {hour}:{minute}:{second}"),
        13 => format!("{year} {month_name} {day} {hour}:{minute}"),
        12 => format!("{year} {month_name} {day} {hour}:00"),
        11 => format!("{day} {month_name} {year}"),
        10 => format!("{month_name} {year}"),
        9 => {
            let suffix = if year > 0 {
                String::new()
            } else {
                format!(" {}", pack.era_bc)
            };
            format!("{}{suffix}", year.abs())
        }
        8 => {
            let decade = year.div_euclid(10) * 10;
            format!("{}{} {era}", decade.abs(), pack.decade_suffix)
        }
        7 => {
            let century = (year.abs() - 1) / 100 + 1;
            format!("{century}{} {era}", pack.century_suffix)
        }
        6 => {
            let millennium = (year.abs() - 1) / 1000 + 1;
            format!("{millennium}{} {era}", pack.millennium_suffix)
        }
        5 => format!("{} {} {era}", year.abs() / 10_000, pack.ten_thousand_years),
        4 => format!(
            "{} {} {era}",
            year.abs() / 100_000,
            pack.hundred_thousand_years
        ),
        3 => format!("{} {} {era}", year.abs() / 1_000_000, pack.million_years),
        2 => format!(
            "{} {} {era}",
            year.abs() / 10_000_000,
            pack.tens_of_millions_years
        ),
        1 => format!(
            "{} {} {era}",
            year.abs() / 100_000_000,
            pack.hundred_million_years
        ),
        0 => format!("{} {} {era}", year.abs() / 1_000_000_000, pack.billion_years),
        other => {
            return Err(TextifyError::time(format!("unknown precision {other}")));
        }
    };
    Ok(text)
}
