//! Error taxonomy for a pipeline invocation.
//!
//! Only [`DashError::SourceUnreadable`] aborts an invocation. Field coercion
//! failures become `None` on the record, and the remaining non-fatal
//! conditions travel as [`Warning`] values next to the report.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("source `{source_id}` is not readable as tabular data: {reason}")]
    SourceUnreadable { source_id: String, reason: String },
    #[error("no source loaded")]
    NoSourceLoaded,
}

/// Failure of the outbound notifier call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notifier timed out after {millis}ms")]
    Timeout { millis: u64 },
    #[error("notifier transport error: {0}")]
    Transport(String),
    #[error("notifier rejected the alert with status {0}")]
    Status(u16),
}

/// Non-fatal conditions surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The filter matched nothing; the unfiltered dataset is shown instead.
    EmptyFilterResult,
    NotificationDeliveryFailure { error_count: u64, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::EmptyFilterResult => {
                write!(f, "No rows match selected filters. Showing all data.")
            }
            Warning::NotificationDeliveryFailure {
                error_count,
                reason,
            } => write!(
                f,
                "alert for {} ERROR logs could not be delivered: {}",
                error_count, reason
            ),
        }
    }
}
