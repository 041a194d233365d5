use crate::alert::{AlertManager, AlertState, AlertTransition};
use crate::filter::FilterOptions;
use crate::history::HistoryEntry;
use crate::session::Invocation;
use std::fmt::Write;

/// Plain-text key metrics for the operator's terminal.
pub fn render_summary(inv: &Invocation) -> String {
    let m = &inv.metrics;
    let mut out = String::new();

    for w in &inv.warnings {
        let _ = writeln!(out, "WARN: {}", w);
    }
    let _ = writeln!(out, "source:      {}", inv.source);
    let _ = writeln!(out, "total logs:  {:>8}", m.total);
    let _ = writeln!(out, "ERROR logs:  {:>8}", m.error_count);
    let _ = writeln!(out, "error rate:  {:>7.2}%", m.error_rate);
    let _ = writeln!(out, "{}", inv.status_line);
    match &inv.transition {
        AlertTransition::Fired(Ok(())) => {
            let _ = writeln!(out, "alert notification sent");
        }
        AlertTransition::Cleared => {
            let _ = writeln!(out, "alert cleared");
        }
        _ => {}
    }

    let _ = writeln!(out, "by level:");
    for (level, count) in &m.counts_by_level {
        let _ = writeln!(out, "  {:<12} {:>8}", level, count);
    }
    let _ = writeln!(out, "by service:");
    for (service, count) in &m.counts_by_service {
        let _ = writeln!(out, "  {:<12} {:>8}", service, count);
    }
    if m.daily_trend.is_empty() {
        let _ = writeln!(out, "trend unavailable (no timestamps)");
    } else {
        let _ = writeln!(out, "per day:");
        for d in &m.daily_trend {
            let _ = writeln!(out, "  {} {:>8}", d.day, d.count);
        }
    }

    out
}

pub fn render_alert_status(alerts: &AlertManager) -> String {
    let state = match alerts.state() {
        AlertState::Normal => "normal",
        AlertState::Alerting => "alerting",
    };
    let delivery = match alerts.last_delivery() {
        None => "none".to_string(),
        Some(Ok(())) => "delivered".to_string(),
        Some(Err(e)) => format!("failed ({})", e),
    };
    format!(
        "alert state: {} (threshold {}, notified this episode: {}, last delivery: {})\n",
        state,
        alerts.threshold(),
        if alerts.notified() { "yes" } else { "no" },
        delivery
    )
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "no invocations yet\n".to_string();
    }
    let mut out = String::new();
    for (i, e) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {}  {}  total={} errors={}",
            i + 1,
            e.run_timestamp.format("%Y-%m-%d %H:%M:%S"),
            e.source,
            e.total,
            e.error_count
        );
    }
    out
}

pub fn render_options(opts: &FilterOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "levels:   {}", opts.levels.join(", "));
    let _ = writeln!(out, "services: {}", opts.services.join(", "));
    match (opts.earliest, opts.latest) {
        (Some(lo), Some(hi)) => {
            let _ = writeln!(out, "time:     {} .. {}", lo.to_rfc3339(), hi.to_rfc3339());
        }
        _ => {
            let _ = writeln!(out, "time:     (no timestamps)");
        }
    }
    out
}
