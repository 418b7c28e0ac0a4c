//! orderly CLI Binary
//!
//! Command-line interface for keeping scoped records densely ordered.

use clap::Parser;
use orderly::cli::{map_error, Cli, RunContext};
use orderly::config::ConfigLoader;
use orderly::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Logging comes up before the run context so config errors are logged too
    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config), &cli.workspace) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("orderly starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing workspace: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command, cli.json) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Logging config from the config file, then CLI flags.
///
/// A config that fails to load falls back to defaults here; RunContext reports
/// the actual error.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path),
        None => ConfigLoader::load(&cli.workspace),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if cli.quiet {
        config.level = "off".to_string();
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    config
}
