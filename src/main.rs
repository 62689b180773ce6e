//! Hookloop CLI
//!
//! # Usage
//!
//! ```bash
//! # Run the demo model
//! hookloop run iterate.yaml --val-batches 4
//!
//! # Resume from the last checkpoint
//! hookloop run iterate.yaml --checkpoint-dir ckpt --restore ckpt/checkpoint.json
//!
//! # Validate config
//! hookloop validate iterate.yaml
//! ```

use clap::Parser;
use hookloop::cli::{init_logger, run_command, Cli, LogLevel};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
