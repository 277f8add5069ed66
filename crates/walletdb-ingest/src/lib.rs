//! walletdb Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads newline-delimited JSON wallet documents into an indexed SQLite store.
//!
//! # Overview
//!
//! - **Validation**: each line becomes a [`NormalizedRecord`] or a [`SkipReason`]
//! - **Batching**: records buffer in a [`BatchAccumulator`] until the commit threshold
//! - **Storage**: [`StoreWriter`] upserts each batch atomically, with bounded retries
//! - **Orchestration**: [`IngestionPipeline`] runs the loop and reports progress
//!
//! # Example
//!
//! ```no_run
//! use walletdb_ingest::{IngestionPipeline, LogObserver, SqliteStore, StoreWriter};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::open("data/wallets.sqlite")?;
//!     let mut pipeline = IngestionPipeline::new(StoreWriter::new(store), 5000, LogObserver);
//!     let input = walletdb_ingest::input::open_input("wallets.jsonl".as_ref())?;
//!     let summary = pipeline.run(input)?;
//!     println!("{} rows", summary.total_records_written);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod validator;

// Re-export commonly used types
pub use batch::{Batch, BatchAccumulator};
pub use config::IngestConfig;
pub use error::{IngestError, Result, StoreError};
pub use pipeline::{IngestObserver, IngestionPipeline, IngestionSummary, LogObserver};
pub use store::{RecordStore, SqliteStore, StoreWriter};
pub use validator::{NormalizedRecord, SkipReason};

use clap::Parser;
use config::{DEFAULT_COMMIT_EVERY, DEFAULT_MAX_RETRIES, DEFAULT_OUTPUT_PATH, DEFAULT_RETRY_BACKOFF_MS};
use std::path::PathBuf;

/// Load a JSONL wallet dump into a SQLite store
#[derive(Parser, Debug)]
#[command(name = "walletdb-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source JSONL file, one wallet document per line (`.gz` accepted)
    #[arg(long = "in", value_name = "PATH", env = "WALLETDB_IN")]
    pub input: PathBuf,

    /// Destination SQLite database
    #[arg(long = "out", value_name = "PATH", env = "WALLETDB_OUT", default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Records per committed batch
    #[arg(
        long,
        value_name = "N",
        env = "WALLETDB_COMMIT_EVERY",
        default_value_t = DEFAULT_COMMIT_EVERY as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub commit_every: u64,

    /// Extra attempts for a batch whose transaction failed
    #[arg(long, value_name = "N", env = "WALLETDB_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Base delay between batch retries, in milliseconds
    #[arg(long, value_name = "MS", env = "WALLETDB_RETRY_BACKOFF_MS", default_value_t = DEFAULT_RETRY_BACKOFF_MS)]
    pub retry_backoff_ms: u64,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
