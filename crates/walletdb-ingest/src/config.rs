//! Ingestion run configuration
//!
//! Resolved from the command line (clap also consults `WALLETDB_*` environment variables)
//! and validated before any file is touched.

use crate::error::{IngestError, Result};
use crate::Cli;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Ingestion Defaults
// ============================================================================

/// Default destination store path.
pub const DEFAULT_OUTPUT_PATH: &str = "data/wallets.sqlite";

/// Default number of records per committed batch.
pub const DEFAULT_COMMIT_EVERY: usize = 5000;

/// Default number of extra attempts for a batch whose transaction failed.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default pause before retrying a failed batch, multiplied by the attempt number.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// Upper bound on retries so a dead store cannot stall a run indefinitely.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Settings for one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Source JSONL file (`.gz` is decompressed on the fly)
    pub input: PathBuf,

    /// Destination SQLite database
    pub output: PathBuf,

    /// Batch flush threshold
    pub commit_every: usize,

    /// Extra attempts for a failed batch transaction
    pub max_retries: u32,

    /// Base delay between attempts
    pub retry_backoff: Duration,
}

impl IngestConfig {
    /// Create a config for `input` with every other setting at its default
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            commit_every: DEFAULT_COMMIT_EVERY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_commit_every(mut self, commit_every: usize) -> Self {
        self.commit_every = commit_every;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(IngestError::config("input path cannot be empty"));
        }

        if self.output.as_os_str().is_empty() {
            return Err(IngestError::config("output path cannot be empty"));
        }

        if self.commit_every == 0 {
            return Err(IngestError::config("commit-every must be greater than 0"));
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(IngestError::config(format!(
                "max-retries ({}) cannot exceed {}",
                self.max_retries, MAX_RETRIES_LIMIT
            )));
        }

        Ok(())
    }
}

impl TryFrom<&Cli> for IngestConfig {
    type Error = IngestError;

    fn try_from(cli: &Cli) -> Result<Self> {
        let commit_every = usize::try_from(cli.commit_every).map_err(|_| {
            IngestError::config(format!("commit-every ({}) is too large", cli.commit_every))
        })?;

        let config = IngestConfig::new(&cli.input)
            .with_output(&cli.output)
            .with_commit_every(commit_every)
            .with_retries(cli.max_retries, Duration::from_millis(cli.retry_backoff_ms));

        config.validate()?;
        Ok(config)
    }
}
