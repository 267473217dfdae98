use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::{parse_date_string, Dialect};

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a string in devdocs. Activity keys and backup
/// file names use it.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a day given on the command line. ISO dates are tried first, then natural language such as
/// "yesterday" or "15/03/2025" relative to `now`.
pub fn parse_day(value: &str, now: DateTime<Local>) -> Result<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_KEY_FORMAT) {
        return Ok(date);
    }
    parse_date_string(value, now, Dialect::Uk)
        .map(|v| v.date_naive())
        .map_err(|e| anyhow!("Can't parse {value:?} into a date: {e}"))
}

/// First day of a month given with a 0-based index, as activity month queries take it.
pub fn month_start(year: i32, month_index: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month_index.checked_add(1)?, 1)
}
