//! Schedule time parsing
//!
//! Accepts RFC 3339 timestamps, relative durations (`30m`, `2h`, `1d`) and
//! natural language (`tomorrow 3pm`, `next monday 10am`). All results are UTC.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CivicastError, Result};

/// Parse a schedule string into a UTC instant
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>> {
    parse_schedule_at(input, Utc::now())
}

/// Like [`parse_schedule`] with an explicit reference time
pub fn parse_schedule_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CivicastError::InvalidInput(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(duration) = parse_duration(input) {
        return Ok(now + duration);
    }

    chrono_english::parse_date_string(input, now, chrono_english::Dialect::Us).map_err(|e| {
        CivicastError::InvalidInput(format!("Could not parse schedule '{}': {}", input, e))
    })
}

fn parse_duration(input: &str) -> Option<Duration> {
    let std_duration = humantime::parse_duration(input).ok()?;
    Duration::try_seconds(i64::try_from(std_duration.as_secs()).ok()?)
}

/// Parse an RFC 3339 timestamp into Unix seconds
pub fn parse_timestamp(input: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.timestamp())
        .map_err(|e| CivicastError::InvalidInput(format!("Invalid timestamp '{}': {}", input, e)))
}

/// Reject instants that are not strictly in the future
pub fn ensure_future(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if at <= now {
        return Err(CivicastError::InvalidInput(format!(
            "Scheduled time {} is not in the future",
            at.to_rfc3339()
        )));
    }
    Ok(())
}

pub fn from_unix(timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| CivicastError::InvalidInput(format!("Timestamp out of range: {}", timestamp)))
}

/// Render Unix seconds for display, falling back to the raw number
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
