//! Aggregation model: summary metrics over a record sequence.

use crate::ingest::Record;
use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

pub const ERROR_LEVEL: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total: u64,
    pub error_count: u64,
    /// Percentage of ERROR records, rounded to 2 decimals.
    pub error_rate: f64,
    pub counts_by_level: BTreeMap<String, u64>,
    pub counts_by_service: BTreeMap<String, u64>,

    /// Sparse, ascending by day. Records without a timestamp are left out.
    pub daily_trend: Vec<DayCount>,
}

/// Compute metrics for `records`. Day boundaries are taken in `tz`.
pub fn compute(records: &[Record], tz: &FixedOffset) -> Metrics {
    let mut counts_by_level: BTreeMap<String, u64> = BTreeMap::new();
    let mut counts_by_service: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut error_count = 0u64;

    for record in records {
        *counts_by_level.entry(record.level.clone()).or_default() += 1;
        *counts_by_service.entry(record.service.clone()).or_default() += 1;

        if record.level == ERROR_LEVEL {
            error_count += 1;
        }

        if let Some(ts) = record.timestamp {
            let day = ts.with_timezone(tz).date_naive();
            *by_day.entry(day).or_default() += 1;
        }
    }

    let total = records.len() as u64;

    Metrics {
        total,
        error_count,
        error_rate: error_rate(error_count, total),
        counts_by_level,
        counts_by_service,
        daily_trend: by_day
            .into_iter()
            .map(|(day, count)| DayCount { day, count })
            .collect(),
    }
}

/// Halves round to the even digit, so 1 in 800 reports 0.12.
fn error_rate(errors: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = errors as f64 / total as f64 * 100.0;
    (pct * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn rec(level: &str, service: &str, ts: Option<(u32, u32)>) -> Record {
        Record {
            timestamp: ts.map(|(d, h)| Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()),
            level: level.to_string(),
            service: service.to_string(),
            time_taken: None,
            fields: BTreeMap::new(),
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn ten_records_three_errors() {
        let mut data = vec![rec("ERROR", "AUTH", Some((1, 9))); 3];
        data.extend(vec![rec("INFO", "AUTH", Some((1, 10))); 7]);

        let m = compute(&data, &utc());
        assert_eq!(m.total, 10);
        assert_eq!(m.error_count, 3);
        assert_eq!(m.error_rate, 30.0);
        assert_eq!(
            m.counts_by_level,
            BTreeMap::from([("ERROR".to_string(), 3), ("INFO".to_string(), 7)])
        );
    }

    #[test]
    fn empty_input_has_zero_rate() {
        let m = compute(&[], &utc());
        assert_eq!(m.total, 0);
        assert_eq!(m.error_rate, 0.0);
        assert!(m.daily_trend.is_empty());
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        let mut data = vec![rec("ERROR", "A", None)];
        data.extend(vec![rec("INFO", "A", None); 2]);
        assert_eq!(compute(&data, &utc()).error_rate, 33.33);
    }

    #[test]
    fn rate_rounds_halves_to_even() {
        assert_eq!(error_rate(1, 800), 0.12);
        assert_eq!(error_rate(1, 160), 0.62);
        assert_eq!(error_rate(3, 800), 0.38);
        assert_eq!(error_rate(1, 8), 12.5);
    }

    fn datasets() -> Vec<Vec<Record>> {
        const LEVELS: [&str; 4] = ["INFO", "ERROR", "WARN", "UNKNOWN"];
        const SERVICES: [&str; 3] = ["AUTH", "DB", "UNKNOWN"];
        let generated = (0..50)
            .map(|i: usize| {
                let ts = if i % 6 == 0 {
                    None
                } else {
                    Some(((i % 9) as u32 + 1, (i * 7 % 24) as u32))
                };
                rec(LEVELS[i * 3 % 4], SERVICES[i % 3], ts)
            })
            .collect();

        vec![
            vec![],
            vec![rec("ERROR", "DB", None)],
            vec![rec("INFO", "AUTH", None); 5],
            vec![
                rec("INFO", "AUTH", None),
                rec("WARN", "DB", Some((2, 1))),
                rec("ERROR", "DB", Some((2, 5))),
                rec("UNKNOWN", "UNKNOWN", None),
            ],
            vec![rec("ERROR", "AUTH", Some((1, 23))); 3],
            generated,
        ]
    }

    #[test]
    fn group_counts_sum_to_total() {
        for data in datasets() {
            let m = compute(&data, &utc());
            let dated = data.iter().filter(|r| r.timestamp.is_some()).count() as u64;

            assert_eq!(m.total, data.len() as u64);
            assert_eq!(m.counts_by_level.values().sum::<u64>(), m.total);
            assert_eq!(m.counts_by_service.values().sum::<u64>(), m.total);
            assert_eq!(m.daily_trend.iter().map(|d| d.count).sum::<u64>(), dated);
            assert!(m.daily_trend.iter().all(|d| d.count > 0));
            assert!(m.daily_trend.windows(2).all(|w| w[0].day < w[1].day));
            assert_eq!(
                m.error_count,
                m.counts_by_level.get(ERROR_LEVEL).copied().unwrap_or(0)
            );
            assert!((0.0..=100.0).contains(&m.error_rate));
            assert!(m.counts_by_service.values().all(|&c| c > 0));
        }
    }

    #[test]
    fn trend_is_sparse_sorted_and_skips_null_timestamps() {
        let data = vec![
            rec("INFO", "A", Some((5, 1))),
            rec("INFO", "A", Some((1, 1))),
            rec("INFO", "A", None),
            rec("INFO", "A", Some((5, 23))),
        ];
        let m = compute(&data, &utc());
        assert_eq!(
            m.daily_trend,
            vec![
                DayCount { day: date(1), count: 1 },
                DayCount { day: date(5), count: 2 },
            ]
        );
        assert_eq!(m.total, 4);
        assert_eq!(m.counts_by_level["INFO"], 4);
    }

    #[test]
    fn day_boundary_follows_the_configured_zone() {
        // 23:00 UTC on the 5th is already the 6th at +02:00.
        let data = vec![rec("INFO", "A", Some((5, 23)))];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let m = compute(&data, &plus_two);
        assert_eq!(m.daily_trend, vec![DayCount { day: date(6), count: 1 }]);
    }
}
