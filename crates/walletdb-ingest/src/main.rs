//! walletdb-ingest - JSONL wallet loader entry point

use clap::Parser;
use std::process;
use tracing::error;
use walletdb_common::logging::{init_logging, LogConfig, LogLevel};
use walletdb_ingest::{commands, Cli, IngestConfig};

fn main() {
    // Values from .env never override variables already set in the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .log_file_prefix("walletdb-ingest")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The loader keeps working without logging
    let _guard = init_logging(&log_config).ok().flatten();

    let result = IngestConfig::try_from(&cli).and_then(|config| commands::ingest::run(&config));

    if let Err(e) = result {
        error!(error = %e, rows_committed = e.rows_committed(), "Ingestion failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
