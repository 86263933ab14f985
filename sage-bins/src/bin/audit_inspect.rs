//! Offline audit-trail inspector
//!
//! Reads an audit file, tallies events, and verifies the per-order
//! lifecycle ordering: ORDER at most once and before any SENT; SENT before
//! any ACK or FILL. Exit code is non-zero when violations are found, so
//! this doubles as a post-run compliance check.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sage_bins::common::init_logging;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Audit file to inspect
    #[arg(default_value = "sage_audit.log")]
    path: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Default)]
struct OrderTrace {
    order_line: Option<usize>,
    sent_line: Option<usize>,
    terminal: Option<&'static str>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let file = File::open(&args.path)
        .with_context(|| format!("opening {}", args.path.display()))?;
    let reader = BufReader::new(file);

    let mut counts: HashMap<String, u64> = HashMap::new();
    let mut traces: HashMap<u64, OrderTrace> = HashMap::new();
    let mut violations = 0u64;
    let mut malformed = 0u64;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.is_empty() {
            continue;
        }

        let mut fields = line.split('|');
        let (Some(_ts), Some(event), Some(id_str)) =
            (fields.next(), fields.next(), fields.next())
        else {
            malformed += 1;
            continue;
        };
        let Ok(order_id) = id_str.parse::<u64>() else {
            malformed += 1;
            continue;
        };

        *counts.entry(event.to_string()).or_default() += 1;
        let trace = traces.entry(order_id).or_default();

        match event {
            "ORDER" => {
                if trace.order_line.is_some() {
                    tracing::error!(line_no, order_id, "duplicate ORDER");
                    violations += 1;
                } else {
                    trace.order_line = Some(line_no);
                }
            }
            "SENT" => {
                if trace.order_line.is_none() {
                    tracing::error!(line_no, order_id, "SENT without prior ORDER");
                    violations += 1;
                }
                trace.sent_line = Some(line_no);
            }
            "ACK" | "FILL" => {
                if trace.sent_line.is_none() {
                    tracing::error!(line_no, order_id, event, "response before SENT");
                    violations += 1;
                }
                if event == "FILL" {
                    trace.terminal = Some("FILL");
                }
            }
            "REJECT" | "ERROR" => {
                trace.terminal = Some(if event == "REJECT" { "REJECT" } else { "ERROR" });
            }
            _ => {
                malformed += 1;
            }
        }
    }

    let never_sent = traces
        .values()
        .filter(|t| t.order_line.is_some() && t.sent_line.is_none())
        .count();
    let filled = traces
        .values()
        .filter(|t| t.terminal == Some("FILL"))
        .count();
    let terminated = traces.values().filter(|t| t.terminal.is_some()).count();

    let mut events: Vec<_> = counts.iter().collect();
    events.sort();
    for (event, count) in events {
        tracing::info!(event, count, "event tally");
    }
    tracing::info!(
        orders = traces.len(),
        never_sent,
        filled,
        terminated,
        malformed,
        violations,
        "lifecycle summary"
    );

    if violations > 0 {
        anyhow::bail!("{} lifecycle violations found", violations);
    }
    Ok(())
}
