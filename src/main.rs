//! layerforge - build-time layer installers
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use layerforge::cli::{Cli, Commands};
use layerforge::config::{Config, ConfigManager};
use layerforge::error::ForgeResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}: {}", style("Error:").red().bold(), e.stage(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> ForgeResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load()?;

    init_logging(cli.verbose, &config);
    debug!("Configuration from {}", config_manager.path().display());

    match cli.command {
        Commands::Detect(args) => layerforge::cli::commands::detect(args, &config),
        Commands::Build(args) => layerforge::cli::commands::build(args, &config),
        Commands::Inspect(args) => layerforge::cli::commands::inspect(args, &config),
        Commands::Key => layerforge::cli::commands::key(&config),
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` is not consulted
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("layerforge=warn"),
        1 => EnvFilter::new("layerforge=info"),
        _ => EnvFilter::new("layerforge=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).without_time().init();
    }
}
