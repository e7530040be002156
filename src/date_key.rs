// Date keys
// `date_key` groups recordings by calendar day and is always derived from `created_at`

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DATE_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid date key pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateKeyParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Derive the `YYYY-MM-DD` key for an RFC 3339 timestamp.
///
/// The calendar date is taken in the timestamp's own offset, so a recording
/// made at 23:30 local time groups under that local day.
pub fn date_key_from_created_at(created_at: &str) -> Result<String> {
    let timestamp = DateTime::parse_from_rfc3339(created_at)
        .with_context(|| format!("Invalid created_at timestamp: {}", created_at))?;
    Ok(timestamp.date_naive().format("%Y-%m-%d").to_string())
}

/// Split a date key into its parts, rejecting malformed or impossible dates
pub fn split_date_key(date_key: &str) -> Option<DateKeyParts> {
    let captures = DATE_KEY_PATTERN.captures(date_key)?;
    let year: i32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let day: u32 = captures[3].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(DateKeyParts {
        year: date.year(),
        month: date.month(),
        day: date.day(),
    })
}
