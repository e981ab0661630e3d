#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for versioned file storage via the libvcstore crate.

use std::{
    io::{self, IsTerminal, Write},
    process,
    sync::Arc,
};

use anyhow::Result;
use clap::Parser;
use libvcstore::VcStoreError;
use tracing_subscriber::EnvFilter;

/// Command-line argument definitions.
mod args;
/// Command implementations.
mod commands;
/// User-facing output.
mod output;

use args::Cli;
use output::{Output, Quiet, Terminal};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "VCSTORE_LOG";

/// Install the stderr log subscriber, filtered by `VCSTORE_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("Failed to install logger: {err}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    // Determine color output preference early for error handling
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    let output: Arc<dyn Output> = if cli.quiet {
        Arc::new(Quiet)
    } else {
        Arc::new(Terminal::new(color))
    };

    if let Err(e) = commands::run(cli, output.as_ref()) {
        // Reset any existing colors only if color was enabled and stdout is a TTY
        if color && io::stdout().is_terminal() {
            print!("\x1b[0m");
            if let Err(flush_err) = io::stdout().flush() {
                eprintln!("Failed to flush stdout while resetting colors: {flush_err}");
            }
        }

        if let Err(display_err) = output.fail(&format!("{e:#}")) {
            eprintln!("Failed to report error via output handler: {display_err:#}");
        }
        if let Err(finish_err) = output.finish() {
            eprintln!("Failed to flush output handler: {finish_err:#}");
        }

        let exit_code = e
            .downcast_ref::<VcStoreError>()
            .map_or(1, VcStoreError::exit_code);
        process::exit(exit_code);
    }
    Ok(())
}
