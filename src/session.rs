//! One operator's session: the loaded dataset plus alert state and history.
//!
//! Every load or filter change is one invocation of
//! filter -> aggregate -> alert -> history over the loaded dataset.

use crate::alert::{AlertManager, AlertState, AlertTransition, Notifier};
use crate::error::{DashError, Warning};
use crate::filter::{self, FilterOptions, FilterSpec};
use crate::history::{HistoryEntry, HistoryLog};
use crate::ingest::{self, Dataset};
use crate::model::{self, Metrics};
use chrono::{DateTime, FixedOffset, Utc};

type Clock = Box<dyn Fn() -> DateTime<Utc>>;

struct Loaded {
    source: String,
    records: Dataset,
}

/// Result of one completed invocation, handed to the rendering layer.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub source: String,
    pub spec: FilterSpec,
    pub records: Dataset,
    pub metrics: Metrics,
    pub warnings: Vec<Warning>,
    pub transition: AlertTransition,
    pub alert_state: AlertState,
    pub status_line: String,
}

pub struct Session {
    tz: FixedOffset,
    alerts: AlertManager,
    history: HistoryLog,
    notifier: Box<dyn Notifier>,
    loaded: Option<Loaded>,
    clock: Clock,
}

impl Session {
    pub fn new(threshold: u64, tz: FixedOffset, notifier: Box<dyn Notifier>) -> Self {
        Self::new_with_clock(threshold, tz, notifier, Box::new(Utc::now))
    }

    /// Same as [`Session::new`] with an injected clock for history timestamps.
    pub fn new_with_clock(
        threshold: u64,
        tz: FixedOffset,
        notifier: Box<dyn Notifier>,
        clock: Clock,
    ) -> Self {
        Self {
            tz,
            alerts: AlertManager::new(threshold),
            history: HistoryLog::new(),
            notifier,
            loaded: None,
            clock,
        }
    }

    /// Load a CSV file and run the default selection over it.
    pub fn load_file(&mut self, path: &str) -> Result<Invocation, DashError> {
        self.load_file_with(path, None)
    }

    /// Load a CSV file and run `spec` (or the default selection) over it.
    pub fn load_file_with(
        &mut self,
        path: &str,
        spec: Option<FilterSpec>,
    ) -> Result<Invocation, DashError> {
        let rows = ingest::read_source_file(path)?;
        self.replace_dataset(path, rows, spec)
    }

    fn replace_dataset(
        &mut self,
        source: &str,
        rows: Vec<ingest::RawRow>,
        spec: Option<FilterSpec>,
    ) -> Result<Invocation, DashError> {
        let records = ingest::normalize(rows, &self.tz);
        log::info!("loaded {} records from {}", records.len(), source);

        let spec =
            spec.unwrap_or_else(|| FilterSpec::select_all(&FilterOptions::from_dataset(&records)));
        self.loaded = Some(Loaded {
            source: source.to_string(),
            records,
        });
        self.apply_filter(spec)
    }

    /// Re-run the pipeline on the loaded dataset with a new selection.
    pub fn apply_filter(&mut self, spec: FilterSpec) -> Result<Invocation, DashError> {
        let loaded = self.loaded.as_ref().ok_or(DashError::NoSourceLoaded)?;
        let mut warnings = Vec::new();

        let outcome = filter::apply(&loaded.records, &spec);
        if outcome.fell_back {
            warnings.push(Warning::EmptyFilterResult);
        }

        let metrics = model::compute(&outcome.records, &self.tz);

        let transition = self
            .alerts
            .evaluate(metrics.error_count, self.notifier.as_ref());
        if let AlertTransition::Fired(Err(e)) = &transition {
            warnings.push(Warning::NotificationDeliveryFailure {
                error_count: metrics.error_count,
                reason: e.to_string(),
            });
        }

        self.history.append(HistoryEntry {
            run_timestamp: (self.clock)(),
            source: loaded.source.clone(),
            total: metrics.total,
            error_count: metrics.error_count,
        });

        Ok(Invocation {
            source: loaded.source.clone(),
            spec,
            records: outcome.records,
            status_line: self.alerts.status_line(metrics.error_count),
            alert_state: self.alerts.state(),
            metrics,
            warnings,
            transition,
        })
    }

    pub fn options(&self) -> Option<FilterOptions> {
        self.loaded
            .as_ref()
            .map(|l| FilterOptions::from_dataset(&l.records))
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.all()
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn timezone(&self) -> &FixedOffset {
        &self.tz
    }
}
