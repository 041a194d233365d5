//! Operator filters over a normalized dataset.

use crate::ingest::{Dataset, Record};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start <= *ts && *ts < self.end
    }
}

/// Operator selection. Empty `levels` / `services` mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSpec {
    pub levels: BTreeSet<String>,
    pub services: BTreeSet<String>,
    pub date_range: Option<DateRange>,
}

impl FilterSpec {
    /// Everything the dataset offers is selected, no date restriction.
    pub fn select_all(options: &FilterOptions) -> Self {
        Self {
            levels: options.levels.iter().cloned().collect(),
            services: options.services.iter().cloned().collect(),
            date_range: None,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&record.level) {
            return false;
        }
        if !self.services.is_empty() && !self.services.contains(&record.service) {
            return false;
        }
        match (&self.date_range, &record.timestamp) {
            (None, _) => true,
            (Some(range), Some(ts)) => range.contains(ts),
            (Some(_), None) => false,
        }
    }
}

/// Choices offered to the operator for a loaded dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    /// Distinct levels, first-seen order.
    pub levels: Vec<String>,
    /// Distinct services, first-seen order.
    pub services: Vec<String>,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &[Record]) -> Self {
        let mut out = FilterOptions::default();
        let mut seen_levels = BTreeSet::new();
        let mut seen_services = BTreeSet::new();

        for record in dataset {
            if seen_levels.insert(record.level.as_str()) {
                out.levels.push(record.level.clone());
            }
            if seen_services.insert(record.service.as_str()) {
                out.services.push(record.service.clone());
            }
            if let Some(ts) = record.timestamp {
                out.earliest = Some(out.earliest.map_or(ts, |e| e.min(ts)));
                out.latest = Some(out.latest.map_or(ts, |l| l.max(ts)));
            }
        }

        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub records: Dataset,
    /// The filter matched nothing and `records` is the unfiltered dataset.
    pub fell_back: bool,
}

/// Apply `spec` to `dataset`. An empty match falls back to the whole dataset.
pub fn apply(dataset: &[Record], spec: &FilterSpec) -> FilterOutcome {
    let records: Dataset = dataset
        .iter()
        .filter(|r| spec.matches(r))
        .cloned()
        .collect();

    if records.is_empty() && !dataset.is_empty() {
        log::warn!("filter matched no records, falling back to the full dataset");
        return FilterOutcome {
            records: dataset.to_vec(),
            fell_back: true,
        };
    }

    FilterOutcome {
        records,
        fell_back: false,
    }
}
