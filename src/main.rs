//! `provision` command-line entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory as _, Parser};

use provision_cli::cli::{Cli, Command};
use provision_cli::commands;
use provision_cli::logging::{self, Logger};

/// Exit status for an operator interrupt (128 + SIGINT).
const INTERRUPTED: i32 = 130;

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let name = args.command.name();

    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(Logger::new(name));

    ctrlc::set_handler(|| {
        tracing::warn!("interrupted, exiting");
        std::process::exit(INTERRUPTED);
    })?;

    match args.command {
        Command::Install(ref opts) => commands::install::run(&args.global, opts, &log),
        Command::Deploy => commands::deploy::run(&args.global, &log),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "provision", &mut std::io::stdout());
            Ok(())
        }
    }
}
