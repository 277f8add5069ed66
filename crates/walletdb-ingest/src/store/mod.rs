//! Durable batch persistence
//!
//! [`RecordStore`] is the seam to the storage engine; [`StoreWriter`] wraps a store with
//! the one-time schema guard and the bounded retry policy. Every flush is all or nothing.

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::batch::Batch;
use crate::config::DEFAULT_MAX_RETRIES;
use crate::error::StoreError;
use crate::validator::NormalizedRecord;
use std::time::Duration;
use tracing::{debug, warn};

/// Storage engine operations needed by the pipeline
pub trait RecordStore {
    /// Create the table and indexes if absent; must be idempotent
    fn ensure_schema(&mut self) -> Result<(), StoreError>;

    /// Upsert every record in one transaction, in order; returns records applied
    ///
    /// On error nothing from `batch` may remain committed.
    fn upsert_batch(&mut self, batch: &[NormalizedRecord]) -> Result<usize, StoreError>;
}

/// Sole writer to a [`RecordStore`]
pub struct StoreWriter<S: RecordStore> {
    store: S,
    schema_ready: bool,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<S: RecordStore> StoreWriter<S> {
    /// Wrap `store` with the default retry policy
    pub fn new(store: S) -> Self {
        Self {
            store,
            schema_ready: false,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::ZERO,
        }
    }

    /// Retry a failed batch up to `max_retries` times, sleeping `backoff * attempt` between tries
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// Create the schema once; later calls are no-ops
    pub fn ensure_schema(&mut self) -> Result<(), StoreError> {
        if !self.schema_ready {
            self.store.ensure_schema()?;
            self.schema_ready = true;
            debug!("Wallet store schema ready");
        }
        Ok(())
    }

    /// Durably upsert `batch` as one transaction; returns rows written
    pub fn flush(&mut self, batch: Batch) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }

        self.ensure_schema()?;

        let mut attempt: u32 = 1;
        loop {
            match self.store.upsert_batch(&batch) {
                Ok(written) => {
                    debug!(rows = written, attempt, "Batch committed");
                    return Ok(written);
                },
                Err(e) if attempt <= self.max_retries => {
                    warn!(
                        error = %e,
                        attempt,
                        batch_size = batch.len(),
                        "Batch write failed, retrying"
                    );
                    std::thread::sleep(self.retry_backoff * attempt);
                    attempt += 1;
                },
                Err(e) => {
                    return Err(StoreError::WriteFailed {
                        batch_size: batch.len(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                },
            }
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::validator::validate;

    /// In-memory store that fails a configurable number of upserts
    #[derive(Default)]
    pub(crate) struct FlakyStore {
        pub schema_calls: usize,
        pub upsert_calls: usize,
        /// Fail this many upserts before succeeding
        pub failures_remaining: usize,
        /// Fail every upsert from this call onward (1-based)
        pub fail_from_call: Option<usize>,
        pub committed: Vec<NormalizedRecord>,
    }

    impl RecordStore for FlakyStore {
        fn ensure_schema(&mut self) -> Result<(), StoreError> {
            self.schema_calls += 1;
            Ok(())
        }

        fn upsert_batch(&mut self, batch: &[NormalizedRecord]) -> Result<usize, StoreError> {
            self.upsert_calls += 1;

            if self.fail_from_call.is_some_and(|from| self.upsert_calls >= from) {
                return Err(StoreError::backend("disk full"));
            }
            if self.failures_remaining > 0 {
                self.failures_remaining -= 1;
                return Err(StoreError::backend("database is locked"));
            }

            self.committed.extend_from_slice(batch);
            Ok(batch.len())
        }
    }

    fn batch(len: usize) -> Batch {
        (0..len)
            .map(|n| validate(&format!(r#"{{"wallet":"0x{n:040x}"}}"#), 1).unwrap())
            .collect()
    }

    #[test]
    fn test_schema_created_once() {
        let mut writer = StoreWriter::new(FlakyStore::default());
        writer.ensure_schema().unwrap();
        writer.ensure_schema().unwrap();
        writer.flush(batch(2)).unwrap();

        assert_eq!(writer.store().schema_calls, 1);
    }

    #[test]
    fn test_flush_lazily_creates_schema() {
        let mut writer = StoreWriter::new(FlakyStore::default());
        assert_eq!(writer.flush(batch(3)).unwrap(), 3);
        assert_eq!(writer.store().schema_calls, 1);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut writer = StoreWriter::new(FlakyStore::default());
        assert_eq!(writer.flush(Vec::new()).unwrap(), 0);
        assert_eq!(writer.store().upsert_calls, 0);
    }

    #[test]
    fn test_transient_failure_is_retried() {
        let store = FlakyStore {
            failures_remaining: 1,
            ..Default::default()
        };
        let mut writer = StoreWriter::new(store).with_retries(1, Duration::ZERO);

        assert_eq!(writer.flush(batch(4)).unwrap(), 4);
        let store = writer.into_inner();
        assert_eq!(store.upsert_calls, 2);
        assert_eq!(store.committed.len(), 4);
    }

    #[test]
    fn test_persistent_failure_surfaces_write_failed() {
        let store = FlakyStore {
            fail_from_call: Some(1),
            ..Default::default()
        };
        let mut writer = StoreWriter::new(store).with_retries(2, Duration::ZERO);

        let err = writer.flush(batch(5)).unwrap_err();
        match err {
            StoreError::WriteFailed {
                batch_size,
                attempts,
                ..
            } => {
                assert_eq!(batch_size, 5);
                assert_eq!(attempts, 3);
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(writer.store().committed.is_empty());
    }

    #[test]
    fn test_no_retries_when_disabled() {
        let store = FlakyStore {
            failures_remaining: 1,
            ..Default::default()
        };
        let mut writer = StoreWriter::new(store).with_retries(0, Duration::ZERO);

        assert!(writer.flush(batch(1)).is_err());
        assert_eq!(writer.store().upsert_calls, 1);
    }
}
