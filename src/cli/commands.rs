//! CLI command implementations

use super::args::{apply_overrides, Cli, Command, RunArgs, ValidateArgs};
use super::demo;
use super::logging::log;
use super::LogLevel;
use crate::config::{load_config, IterConfig};
use crate::iterator::ShutdownController;

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    let level = LogLevel::from_flags(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => run_run(args, level),
        Command::Validate(args) => run_validate(args, level),
    }
}

/// Format iteration settings as a string
pub fn format_config(config: &IterConfig) -> String {
    let mut lines = vec![
        format!("  Epochs: {}", config.num_epochs),
        format!("  Hook frequency: {}", config.hook_freq),
    ];
    if let Some(num_steps) = config.num_steps {
        lines.push(format!("  Step budget: {num_steps}"));
    }
    if let Some(every) = config.validation_frequency() {
        lines.push(format!("  Validation every: {every} steps"));
    }
    if config.test_mode {
        lines.push("  Test mode: on".to_string());
    }
    lines.join("\n")
}

fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(level, LogLevel::Normal, &format!("Validating config: {}", args.config.display()));

    let config = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");
    log(level, LogLevel::Verbose, &format_config(&config));
    Ok(())
}

fn run_run(args: RunArgs, level: LogLevel) -> Result<(), String> {
    let banner = format!("Hookloop: running demo from {}", args.config.display());
    log(level, LogLevel::Normal, &banner);

    let mut config = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    apply_overrides(&mut config, &args);
    log(level, LogLevel::Verbose, &format_config(&config));

    let mut splits = demo::splits(args.train_batches, args.val_batches, args.batch_size)
        .map_err(|e| format!("Data error: {e}"))?;
    let shutdown = ShutdownController::install().map_err(|e| format!("Signal error: {e}"))?;
    let mut iterator = demo::iterator(config, args.checkpoint_dir.as_deref())
        .map_err(|e| format!("Config error: {e}"))?
        .with_shutdown(shutdown);
    iterator.initialize(args.restore.as_deref()).map_err(|e| format!("Restore error: {e}"))?;

    let summary = iterator.iterate(&mut splits).map_err(|e| format!("Iteration error: {e}"))?;

    let model = iterator.model();
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Done: {} epochs, global step {}, weight {:.4}, bias {:.4}",
            summary.epochs, summary.global_step, model.weight, model.bias
        ),
    );
    if summary.validation_fallback {
        log(level, LogLevel::Verbose, "  Validation defaulted to the train split");
    }
    Ok(())
}
