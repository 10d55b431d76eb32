//! Timestamp parsing for the raw extracts.

use chrono::{NaiveDate, NaiveDateTime};

/// Configuration for timestamp parsing
#[derive(Debug, Clone)]
pub struct TimestampFormatConfig {
    /// Date-time formats tried in order
    pub datetime_formats: Vec<String>,
    /// Date-only formats tried after the date-time formats (midnight is assumed)
    pub date_formats: Vec<String>,
}

impl Default for TimestampFormatConfig {
    fn default() -> Self {
        Self {
            datetime_formats: vec![
                "%Y-%m-%d %H:%M:%S".to_string(), // MIMIC: 2150-03-01 12:00:00
                "%Y-%m-%dT%H:%M:%S".to_string(), // ISO 8601
                "%Y-%m-%d %H:%M:%S%.f".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
            ],
            date_formats: vec![
                "%Y-%m-%d".to_string(), // ISO format: 2150-03-01
                "%Y%m%d".to_string(),   // Compact: 21500301
            ],
        }
    }
}

/// Parse a timestamp string with multiple format attempts
///
/// Empty strings and unrecognised formats yield `None`.
#[must_use]
pub fn parse_timestamp(s: &str, config: &TimestampFormatConfig) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in &config.datetime_formats {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }

    for format in &config.date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}
