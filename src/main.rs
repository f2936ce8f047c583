mod archive;
mod atomic_file;
mod cli;
mod config;
mod layout;
mod ledger;
mod logging;
mod message;
mod progress;
mod sink;
mod source;
mod sync;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Exports a mailbox into a restartable archive.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding `accounts/<account>.toml`
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run or resume the export of an account
    Start {
        /// Account name or path to an account file
        account: String,
    },
    /// Print the persisted run state of an account
    State { account: String },
    /// List the available sources and sinks with their configuration keys
    Options,
    /// Delete everything exported for an account and reset its run state
    Nuke { account: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    cli::run(&args)
}
