use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One raw row from the tabular source: trimmed column name -> cell text.
pub type RawRow = BTreeMap<String, String>;

/// A single normalized log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: String,
    pub service: String,
    pub time_taken: Option<f64>,

    /// Columns the pipeline does not interpret, kept for display.
    pub fields: BTreeMap<String, String>,
}

/// Ordered records as they appeared in the source.
pub type Dataset = Vec<Record>;
