//! CLI command definitions and dispatch.

pub mod inspect;
pub mod run;

use clap::{Parser, Subcommand, ValueEnum};

/// dropcheck: verify that deployed artifacts carry the instrumented launch command.
#[derive(Parser, Debug)]
#[command(name = dropcheck_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Format of diagnostic log lines on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Diagnostic log encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision, build, fetch, and verify a scenario, then tear it down.
    Run(run::RunArgs),
    /// Check the launch command inside an already-downloaded artifact.
    Inspect(inspect::InspectArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command fails or its check does not pass.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Inspect(args) => inspect::execute(args),
    }
}
