//! Error types for wallet ingestion
//!
//! Per-line problems are [`SkipReason`](crate::validator::SkipReason) values and never
//! escape the pipeline. Everything here is fatal for a run.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Failure reported by a [`RecordStore`](crate::store::RecordStore) backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database could not be opened
    #[error("Failed to open wallet store at '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite rejected a statement or transaction
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failure from a backend that does not speak SQLite
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A batch could not be committed within the retry budget
    #[error("Batch of {batch_size} record(s) was not committed after {attempts} attempt(s): {source}")]
    WriteFailed {
        batch_size: usize,
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Fatal ingestion failure
#[derive(Error, Debug)]
pub enum IngestError {
    /// Settings are out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The input file could not be opened
    #[error("Failed to open input '{path}': {source}. Verify the file exists and is readable.")]
    OpenInput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The destination directory could not be prepared
    #[error("Failed to prepare output directory '{path}': {source}. Check file permissions and disk space.")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the input stream failed part way through
    #[error("Failed to read input at line {line} ({rows_committed} row(s) committed before the failure): {source}")]
    Input {
        line: u64,
        rows_committed: u64,
        #[source]
        source: std::io::Error,
    },

    /// The store rejected a batch; rows already committed stay durable
    #[error("Store write failed with {rows_committed} row(s) committed before the failure: {source}")]
    Store {
        rows_committed: u64,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Rows durably written before the run stopped, when known
    pub fn rows_committed(&self) -> Option<u64> {
        match self {
            Self::Input { rows_committed, .. } | Self::Store { rows_committed, .. } => {
                Some(*rows_committed)
            },
            Self::Config(_) | Self::OpenInput { .. } | Self::Output { .. } => None,
        }
    }
}
