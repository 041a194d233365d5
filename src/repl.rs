//! Line-oriented operator session.
//!
//! Commands:
//!   load PATH
//!   filter [level=A,B] [service=X,Y] [from=T] [to=T]
//!   options | history | status | report PATH | help | quit
//!
//! `to` is exclusive. Timestamps use the same shapes as the source column;
//! use the `T` separator since arguments are whitespace-delimited.

use crate::filter::{DateRange, FilterSpec};
use crate::ingest::normalize::parse_timestamp;
use crate::render;
use crate::session::{Invocation, Session};
use crate::Result;

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, FixedOffset, Utc};
use regex::Regex;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  load PATH                                   load a CSV export
  filter [level=A,B] [service=X] [from=T] [to=T]
                                              re-run with a new selection
  options                                     list levels, services, time span
  history                                     list invocations of this session
  status                                      show alert state and last delivery
  report PATH                                 write the last result as JSON
  help                                        show this text
  quit                                        end the session
";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(String),
    Filter(FilterArgs),
    Options,
    History,
    Status,
    Report(String),
    Help,
    Quit,
}

/// Filter selection as typed by the operator, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    pub levels: Vec<String>,
    pub services: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl FilterArgs {
    /// Build a [`FilterSpec`], normalizing labels like the source columns.
    pub fn to_spec(&self, tz: &FixedOffset) -> Result<FilterSpec> {
        let labels = |items: &[String]| -> BTreeSet<String> {
            items
                .iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let bound = |raw: &Option<String>, name: &str| -> Result<Option<DateTime<Utc>>> {
            raw.as_deref()
                .map(|s| parse_timestamp(s, tz).ok_or_else(|| anyhow!("bad {} time: {:?}", name, s)))
                .transpose()
        };

        let from = bound(&self.from, "from")?;
        let to = bound(&self.to, "to")?;

        let date_range = match (from, to) {
            (None, None) => None,
            (start, end) => {
                let start = start.unwrap_or(DateTime::<Utc>::MIN_UTC);
                let end = end.unwrap_or(DateTime::<Utc>::MAX_UTC);
                if start >= end {
                    bail!("empty date range: from must be before to");
                }
                Some(DateRange { start, end })
            }
        };

        Ok(FilterSpec {
            levels: labels(&self.levels),
            services: labels(&self.services),
            date_range,
        })
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let cmd = match word {
        "load" => Command::Load(required_arg(rest, "load")?),
        "filter" => Command::Filter(parse_filter_args(rest)?),
        "options" => Command::Options,
        "history" => Command::History,
        "status" => Command::Status,
        "report" => Command::Report(required_arg(rest, "report")?),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {:?} (try `help`)", other),
    };
    Ok(Some(cmd))
}

fn required_arg(rest: &str, cmd: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("`{}` needs a path", cmd);
    }
    Ok(rest.to_string())
}

fn parse_filter_args(rest: &str) -> Result<FilterArgs> {
    let re = Regex::new(r"^(level|levels|service|services|from|to)=(\S*)$")?;
    let mut args = FilterArgs::default();

    for token in rest.split_whitespace() {
        let caps = re
            .captures(token)
            .ok_or_else(|| anyhow!("cannot parse filter argument {:?}", token))?;
        let value = caps[2].to_string();
        let list = || -> Vec<String> {
            value
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        match &caps[1] {
            "level" | "levels" => args.levels.extend(list()),
            "service" | "services" => args.services.extend(list()),
            "from" => args.from = Some(value.clone()),
            "to" => args.to = Some(value.clone()),
            _ => unreachable!("regex only admits known keys"),
        }
    }

    Ok(args)
}

/// Drive `session` from `input` until EOF or `quit`.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: R, mut out: W) -> Result<()> {
    let mut last: Option<Invocation> = None;

    writeln!(out, "logdash session, `help` for commands")?;
    for line in input.lines() {
        let line = line.context("read session input")?;

        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "error: {}", e)?;
                continue;
            }
        };

        match cmd {
            Command::Quit => break,
            Command::Help => write!(out, "{}", HELP)?,
            Command::Load(path) => match session.load_file(&path) {
                Ok(inv) => {
                    write!(out, "{}", render::render_summary(&inv))?;
                    last = Some(inv);
                }
                Err(e) => writeln!(out, "error: {}", e)?,
            },
            Command::Filter(args) => {
                let result = args
                    .to_spec(session.timezone())
                    .and_then(|spec| session.apply_filter(spec).map_err(Into::into));
                match result {
                    Ok(inv) => {
                        write!(out, "{}", render::render_summary(&inv))?;
                        last = Some(inv);
                    }
                    Err(e) => writeln!(out, "error: {}", e)?,
                }
            }
            Command::Options => match session.options() {
                Some(opts) => write!(out, "{}", render::render_options(&opts))?,
                None => writeln!(out, "error: no source loaded")?,
            },
            Command::History => write!(out, "{}", render::render_history(session.history()))?,
            Command::Status => write!(out, "{}", render::render_alert_status(session.alerts()))?,
            Command::Report(path) => match &last {
                Some(inv) => {
                    let json = render::render_json_report(inv)?;
                    match std::fs::write(&path, json) {
                        Ok(()) => writeln!(out, "Wrote {}", path)?,
                        Err(e) => writeln!(out, "error: write {}: {}", path, e)?,
                    }
                }
                None => writeln!(out, "error: nothing to report yet")?,
            },
        }
    }

    Ok(())
}
