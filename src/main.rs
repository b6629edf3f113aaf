//! tablewatch - resilient web table poller.
//!
//! Exit codes: 0 after cancellation, 1 after a fatal error (cleanup has
//! run), 2 for configuration errors found before starting.

mod cli;
mod engine;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use tablewatch_config::{Config, ConfigError, ConfigLoader, ConfigValidator, ValidationWarning};
use tablewatch_runloop::{CancellationToken, Orchestrator, RunSettings, install_signal_handlers};
use tablewatch_store_sqlite::SqliteRecordStore;

use crate::cli::Cli;

const EXIT_FATAL: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn load_config(cli: &Cli) -> Result<(Config, Vec<ValidationWarning>), ConfigError> {
    let config = ConfigLoader::load(&cli.config)?;
    let warnings = ConfigValidator::validate(&config)?.into_result()?;
    Ok((config, warnings))
}

fn print_schema(config: &Config) {
    println!("Configuration OK: {}", config.source.url);
    println!(
        "Engine: {}, table: {}, rows labelled by '{}'",
        config.browser.engine,
        config.source.table.css(),
        config.source.row_label_column
    );
    for target in &config.targets {
        println!("  {}", target.name);
        for field in &target.fields {
            println!("    {:<12} <- ({}, {})", field.name, field.row, field.column);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, warnings) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error ({}): {}", cli.config.display(), e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if cli.check {
        for warning in &warnings {
            eprintln!("warning: {}", warning);
        }
        print_schema(&config);
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init_tracing(&config.logging, cli.log_level.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }
    for warning in &warnings {
        warn!("{}", warning);
    }

    let settings = match RunSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let cancel = CancellationToken::new();
    if let Err(e) = install_signal_handlers(cancel.clone()) {
        error!(error = %e, "Cannot install signal handlers");
        return ExitCode::from(EXIT_FATAL);
    }

    info!("Starting tablewatch v{}", env!("CARGO_PKG_VERSION"));
    info!(config = %cli.config.display(), db = %config.storage.path.display(), "Loaded configuration");

    let source = engine::build_source(&config);
    let store = Arc::new(SqliteRecordStore::new(&config.storage.path));
    let mut orchestrator = Orchestrator::new(settings, source, store, cancel);

    match orchestrator.run().await {
        Ok(summary) => {
            info!(
                cycles = summary.cycles,
                rows_written = summary.rows_written,
                refreshes = summary.refreshes,
                unwritten = summary.unwritten,
                uptime_secs = summary.uptime.as_secs(),
                "Stopped"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Stopped on fatal error");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
