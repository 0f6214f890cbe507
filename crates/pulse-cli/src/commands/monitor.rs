// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::exit_error::ExitError;
use crate::support::{load_config, load_verify_key, metrics_path};
use chrono::Utc;
use clap::Args;
use pulse_query::{EventFilters, QueryService};
use std::collections::BTreeMap;

#[derive(Args)]
pub struct QueryArgs {
    /// Look back this long, e.g. `1h`, `30m`, `2d`. Mutually exclusive with `--since`.
    #[arg(long)]
    last: Option<String>,
    /// Look back to this RFC3339 timestamp. Mutually exclusive with `--last`.
    #[arg(long)]
    since: Option<String>,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long = "daemon")]
    daemon: Option<String>,
    #[arg(long = "event-type")]
    event_type: Option<String>,
    /// A metrics window label or duration expression, e.g. `10m`.
    #[arg(long)]
    window: Option<String>,
    /// Cap the number of printed events.
    #[arg(long)]
    samples: Option<usize>,
    #[arg(long, conflicts_with = "events_only")]
    metrics_only: bool,
    #[arg(long, conflicts_with = "metrics_only")]
    events_only: bool,
}

fn raw_filters(args: &QueryArgs) -> BTreeMap<String, String> {
    let mut raw = BTreeMap::new();
    if let Some(v) = &args.priority {
        raw.insert("priority".to_string(), v.clone());
    }
    if let Some(v) = &args.daemon {
        raw.insert("source_daemon".to_string(), v.clone());
    }
    if let Some(v) = &args.event_type {
        raw.insert("event_type".to_string(), v.clone());
    }
    raw
}

pub fn run(args: QueryArgs) -> Result<(), ExitError> {
    let config = load_config()?;
    let verify_key = load_verify_key(&config)?;
    let service = QueryService::new(
        config.history_root.clone(),
        metrics_path(&config),
        config.codex_ledger_path.clone(),
        verify_key,
    );

    let raw = raw_filters(&args);
    let filters = EventFilters::from_raw(&raw).map_err(|error| ExitError::new(1, error.to_string()))?;

    if !args.metrics_only {
        let since = match (&args.since, &args.last) {
            (Some(since), _) => chrono::DateTime::parse_from_rfc3339(since)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|error| ExitError::new(1, format!("invalid --since: {error}")))?,
            (None, Some(last)) => {
                let duration = pulse_query::parse_window(last).map_err(|error| ExitError::new(1, error.to_string()))?;
                Utc::now() - duration
            }
            (None, None) => Utc::now() - chrono::Duration::hours(1),
        };

        let mut events = service
            .query_events(since, &filters, "pulse-cli")
            .map_err(|error| ExitError::new(1, error.to_string()))?;
        if let Some(limit) = args.samples {
            events.truncate(limit);
        }

        println!("{}", crate::color::header(&format!("events since {}", since.to_rfc3339())));
        for event in &events {
            println!(
                "{} [{}] {}/{} {}",
                event.timestamp,
                event.priority,
                crate::color::literal(&event.source_daemon),
                crate::color::literal(&event.event_type),
                serde_json::Value::Object(event.payload.clone()),
            );
        }
        println!("{}", crate::color::context(&format!("{} event(s)", events.len())));
    }

    if !args.events_only {
        if let Some(window) = &args.window {
            match service.query_metrics(window, &filters, "pulse-cli") {
                Ok(result) => {
                    println!("{}", crate::color::header(&format!("metrics window {window}")));
                    println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
                }
                Err(error) => {
                    return Err(ExitError::new(1, error.to_string()));
                }
            }
        }
    }

    Ok(())
}
