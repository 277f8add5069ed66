//! `walletdb-ingest` command implementation
//!
//! Opens the input and the store, runs the pipeline, and prints the final report.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::input::open_input;
use crate::pipeline::{IngestObserver, IngestionPipeline, IngestionSummary};
use crate::progress::{format_rate, SpinnerObserver};
use crate::store::{SqliteStore, StoreWriter};
use std::path::Path;
use tracing::info;

/// Ingest `config.input` into `config.output`, printing the report to stdout
pub fn run(config: &IngestConfig) -> Result<IngestionSummary> {
    let summary = ingest(config, SpinnerObserver::new())?;

    println!("{}", summary_line(&summary, &config.output));
    Ok(summary)
}

/// Run the pipeline with a caller-supplied observer and no stdout output
pub fn ingest<O: IngestObserver>(config: &IngestConfig, observer: O) -> Result<IngestionSummary> {
    config.validate()?;
    prepare_output_dir(&config.output)?;

    let reader = open_input(&config.input)?;
    let store = SqliteStore::open(&config.output).map_err(|source| IngestError::Store {
        rows_committed: 0,
        source,
    })?;

    info!(
        input = %config.input.display(),
        output = %store.location(),
        commit_every = config.commit_every,
        "Starting wallet ingestion"
    );

    let writer = StoreWriter::new(store).with_retries(config.max_retries, config.retry_backoff);
    let mut pipeline = IngestionPipeline::new(writer, config.commit_every, observer);
    let summary = pipeline.run(reader)?;

    info!(
        rate = %format_rate(summary.total_records_written, summary.elapsed),
        "Throughput"
    );

    Ok(summary)
}

/// One-line report: rows, elapsed seconds, destination
pub fn summary_line(summary: &IngestionSummary, output: &Path) -> String {
    format!(
        "[done] inserted {} wallets in {:.1}s → {}",
        summary.total_records_written,
        summary.elapsed.as_secs_f64(),
        output.display()
    )
}

fn prepare_output_dir(output: &Path) -> Result<()> {
    let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    std::fs::create_dir_all(parent).map_err(|source| IngestError::Output {
        path: parent.display().to_string(),
        source,
    })
}
