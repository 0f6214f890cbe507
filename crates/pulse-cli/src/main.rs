// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pulse`: the CLI surface over the signed pulse bus — read-only queries
//! (`monitor query`), the operator gate for predictive patches (`codex
//! confirm`/`codex reject`), and the long-lived supervisor (`serve`).
//! Mirrors the teacher's `oj` CLI bootstrap: a `tracing-subscriber`
//! env-filter installed once in `main`, subcommands returning [`ExitError`]
//! for process-exit-code mapping rather than calling `std::process::exit`
//! themselves.

mod cli;
mod color;
mod commands;
mod exit_error;
mod process;
mod support;

use clap::Parser;
use cli::{Cli, CodexCommand, Command, MonitorCommand};
use exit_error::ExitError;
use tracing_subscriber::EnvFilter;

fn install_logging(log_level: Option<&str>) {
    let filter = log_level
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    install_logging(cli.log_level.as_deref());

    let result = match cli.command {
        Command::Monitor(MonitorCommand::Query(args)) => commands::monitor::run(args),
        Command::Codex(CodexCommand::Confirm(args)) => commands::codex::confirm(args),
        Command::Codex(CodexCommand::Reject(args)) => commands::codex::reject(args),
        Command::Serve => commands::serve::run().await,
    };

    if let Err(error) = result {
        report_and_exit(error);
    }
}

fn report_and_exit(error: ExitError) -> ! {
    eprintln!("{}", color::header("error:"));
    eprintln!("{error}");
    std::process::exit(error.code);
}
