//! CLI module for hookloop
//!
//! Argument parsing, command handlers and the built-in demo model driven by
//! `hookloop run`.

mod args;
mod commands;
pub mod demo;
mod logging;

pub use args::{apply_overrides, parse_args, Cli, Command, RunArgs, ValidateArgs};
pub use commands::{format_config, run_command};
pub use logging::{init_logger, LogLevel};
