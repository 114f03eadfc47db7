//! Conductor CLI Binary
//!
//! Command-line entry points for the fan-out, plan, refine and route workflows.

use clap::Parser;
use conductor::cli::{load_config, map_error, Cli, RunContext};
use conductor::config::ConductorConfig;
use conductor::logging::{init_logging, LoggingConfig};
use conductor::provider::ProviderKind;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli.workspace, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    // Initialize logging early
    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!(command = cli.command.name(), "Conductor CLI starting");

    let context = match RunContext::with_config(apply_cli_overrides(&cli, config)) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing run context: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

fn apply_cli_overrides(cli: &Cli, mut config: ConductorConfig) -> ConductorConfig {
    if cli.offline {
        config.provider.kind = ProviderKind::Stub;
    }
    config
}

/// Build logging configuration from CLI args over the config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, config: &ConductorConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();

    if cli.quiet {
        logging.enabled = false;
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = cli.log_format.as_deref().and_then(|f| f.parse().ok()) {
        logging.format = format;
    }
    if let Some(output) = cli.log_output.as_deref().and_then(|o| o.parse().ok()) {
        logging.output = output;
    }
    if let Some(ref file) = cli.log_file {
        logging.file = file.clone();
    }
    logging
}
