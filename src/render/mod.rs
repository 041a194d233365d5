//! Read-only views of an invocation for display.

pub mod json;
pub mod text;

pub use json::render_json_report;
pub use text::{render_alert_status, render_history, render_options, render_summary};
