mod cli;
mod commands;
mod config;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use portal_logging::{portal_error, portal_warn, LogDestination};

use crate::cli::Cli;
use crate::config::DEFAULT_CONFIG_FILE;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let loaded = config::load_config(&config_path);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    cli.apply_overrides(&mut config);

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    portal_logging::initialize(LogDestination::from_flag(config.log_to_file), level);
    if let Err(err) = &loaded {
        portal_warn!("{}; using defaults", err);
    }

    match commands::run(cli.command, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            portal_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
