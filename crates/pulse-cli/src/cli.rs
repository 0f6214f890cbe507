// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pulse", version, about = "Signed pulse bus: query and predictive-repair control", styles = crate::color::styles())]
pub struct Cli {
    /// Overrides `RUST_LOG` for this invocation.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read-only queries over history and monitoring snapshots.
    #[command(subcommand)]
    Monitor(MonitorCommand),
    /// Operator gate for predictive patches awaiting confirmation.
    #[command(subcommand)]
    Codex(CodexCommand),
    /// Run the long-lived supervisor process (bus, federation, daemons, HTTP).
    Serve,
}

#[derive(Subcommand)]
pub enum MonitorCommand {
    Query(crate::commands::monitor::QueryArgs),
}

#[derive(Subcommand)]
pub enum CodexCommand {
    Confirm(crate::commands::codex::PatchArgs),
    Reject(crate::commands::codex::PatchArgs),
}
