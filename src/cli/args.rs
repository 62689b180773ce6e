//! Core CLI types - Cli, Command, and argument structs

use crate::config::IterConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hookloop: hook-driven model iteration
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "hookloop")]
#[command(version)]
#[command(about = "Drive a model over train/validation splits with lifecycle hooks")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the built-in demo model with settings from a YAML file
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Batches per epoch in the train split
    #[arg(long, default_value_t = 16)]
    pub train_batches: usize,

    /// Batches per epoch in the validation split (omit for no validation split)
    #[arg(long)]
    pub val_batches: Option<usize>,

    /// Examples per batch
    #[arg(short, long, default_value_t = 4)]
    pub batch_size: usize,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override the global step budget
    #[arg(long)]
    pub num_steps: Option<u64>,

    /// Dry run: no training ticks, one pass
    #[arg(long)]
    pub test_mode: bool,

    /// Write checkpoints to this directory
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Restore the global step from a checkpoint
    #[arg(short, long)]
    pub restore: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to an IterConfig
pub fn apply_overrides(config: &mut IterConfig, args: &RunArgs) {
    if let Some(epochs) = args.epochs {
        config.num_epochs = epochs;
    }
    if let Some(num_steps) = args.num_steps {
        config.num_steps = Some(num_steps);
    }
    if args.test_mode {
        config.test_mode = true;
    }
}
