//! Runtime configuration from the environment (and `.env`).
//!
//! | variable                      | default |
//! |-------------------------------|---------|
//! | `LOGDASH_ERROR_THRESHOLD`     | 1000    |
//! | `LOGDASH_TIMEZONE`            | UTC     |
//! | `LOGDASH_WEBHOOK_URL`         | unset   |
//! | `LOGDASH_NOTIFY_TIMEOUT_SECS` | 5       |
//! | `RUST_LOG`                    | info    |

use crate::alert::DEFAULT_ERROR_THRESHOLD;
use chrono::{FixedOffset, Offset, Utc};
use regex::Regex;
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
    #[error("invalid time zone {0:?} (expected UTC, Z or +HH:MM)")]
    InvalidTimeZone(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub error_threshold: u64,
    /// Zone used for naive timestamps and for daily trend boundaries.
    pub timezone: FixedOffset,
    pub webhook_url: Option<String>,
    pub notify_timeout: Duration,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            timezone: utc(),
            webhook_url: None,
            notify_timeout: Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(raw) = env::var("LOGDASH_ERROR_THRESHOLD") {
            config.error_threshold = parse_u64("LOGDASH_ERROR_THRESHOLD", &raw)?;
        }
        if let Ok(raw) = env::var("LOGDASH_TIMEZONE") {
            config.timezone = parse_timezone(&raw)?;
        }
        config.webhook_url = env::var("LOGDASH_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        if let Ok(raw) = env::var("LOGDASH_NOTIFY_TIMEOUT_SECS") {
            let secs = parse_u64("LOGDASH_NOTIFY_TIMEOUT_SECS", &raw)?;
            config.notify_timeout = Duration::from_secs(secs);
        }
        if let Ok(level) = env::var("RUST_LOG") {
            config.rust_log = level;
        }

        Ok(config)
    }
}

fn parse_u64(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.to_string(),
        })
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse `UTC`, `Z`, `+05:30`, `-0800` or `UTC+01:00` into a fixed offset.
pub fn parse_timezone(raw: &str) -> Result<FixedOffset, ConfigError> {
    let s = raw.trim();
    let invalid = || ConfigError::InvalidTimeZone(raw.to_string());

    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return Ok(utc());
    }

    let re = Regex::new(r"^(?i:utc)?([+-])(\d{2}):?(\d{2})$").map_err(|_| invalid())?;
    let caps = re.captures(s).ok_or_else(invalid)?;

    let sign = if &caps[1] == "-" { -1 } else { 1 };
    let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
    let minutes: i32 = caps[3].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timezone_forms() {
        assert_eq!(parse_timezone("UTC").unwrap(), utc());
        assert_eq!(parse_timezone("z").unwrap(), utc());
        assert_eq!(
            parse_timezone("+05:30").unwrap(),
            FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(
            parse_timezone("UTC-0800").unwrap(),
            FixedOffset::west_opt(8 * 3600).unwrap()
        );
    }

    #[test]
    fn rejects_bad_timezone() {
        assert_eq!(
            parse_timezone("Europe/Paris"),
            Err(ConfigError::InvalidTimeZone("Europe/Paris".to_string()))
        );
        assert!(parse_timezone("+25:00").is_err());
    }

    #[test]
    fn bad_threshold_is_reported() {
        let err = parse_u64("LOGDASH_ERROR_THRESHOLD", "lots").unwrap_err();
        assert_eq!(err.to_string(), "invalid value for LOGDASH_ERROR_THRESHOLD: \"lots\"");
    }
}
