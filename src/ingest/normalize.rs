//! Raw rows -> canonical records.
//!
//! Coercion is lenient: a cell that does not parse becomes `None` and the
//! row is kept.

use crate::ingest::row::{Dataset, RawRow, Record};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub const COL_TIMESTAMP: &str = "Timestamp";
pub const COL_LEVEL: &str = "LogLevel";
pub const COL_SERVICE: &str = "Service";
pub const COL_TIME_TAKEN: &str = "TimeTaken";

pub const UNKNOWN: &str = "UNKNOWN";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

pub fn normalize(rows: Vec<RawRow>, tz: &FixedOffset) -> Dataset {
    rows.into_iter().map(|row| normalize_row(row, tz)).collect()
}

fn normalize_row(mut row: RawRow, tz: &FixedOffset) -> Record {
    let level = row.remove(COL_LEVEL);
    let service = row.remove(COL_SERVICE);
    let time_taken = row.remove(COL_TIME_TAKEN);
    let timestamp = row.remove(COL_TIMESTAMP);

    Record {
        timestamp: timestamp.as_deref().and_then(|s| parse_timestamp(s, tz)),
        level: normalize_label(level.as_deref()),
        service: normalize_label(service.as_deref()),
        time_taken: time_taken.as_deref().and_then(parse_number),
        fields: row,
    }
}

fn normalize_label(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_uppercase(),
        _ => UNKNOWN.to_string(),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse a timestamp cell. Values without an offset are read in `tz`.
pub fn parse_timestamp(raw: &str, tz: &FixedOffset) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
