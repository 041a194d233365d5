use crate::alert::AlertState;
use crate::error::Warning;
use crate::filter::FilterSpec;
use crate::ingest::Record;
use crate::model::Metrics;
use crate::session::Invocation;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct AlertView<'a> {
    state: AlertState,
    status: &'a str,
}

#[derive(Debug, Serialize)]
struct ReportView<'a> {
    source: &'a str,
    filter: &'a FilterSpec,
    warnings: Vec<WarningView<'a>>,
    alert: AlertView<'a>,
    metrics: &'a Metrics,

    /// Newest first; records without a timestamp go last.
    records: Vec<&'a Record>,
}

#[derive(Debug, Serialize)]
struct WarningView<'a> {
    message: String,
    #[serde(flatten)]
    detail: &'a Warning,
}

/// Render the invocation as a pretty-printed JSON document.
pub fn render_json_report(inv: &Invocation) -> anyhow::Result<String> {
    let view = ReportView {
        source: &inv.source,
        filter: &inv.spec,
        warnings: inv
            .warnings
            .iter()
            .map(|w| WarningView {
                message: w.to_string(),
                detail: w,
            })
            .collect(),
        alert: AlertView {
            state: inv.alert_state,
            status: &inv.status_line,
        },
        metrics: &inv.metrics,
        records: newest_first(&inv.records),
    };

    Ok(serde_json::to_string_pretty(&view)?)
}

fn newest_first(records: &[Record]) -> Vec<&Record> {
    let mut out: Vec<&Record> = records.iter().collect();
    // Option orders None first, so reversing puts missing timestamps last.
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}
