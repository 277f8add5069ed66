//! Ingestion pipeline
//!
//! Drives the read loop for one input stream:
//!
//! ```text
//! Idle -> Reading -> (Reading | FlushingBatch)* -> FlushingFinalBatch -> Done
//! ```
//!
//! Bad lines are isolated: blank and badly formatted wallets are dropped silently,
//! malformed JSON and invalid ranks go to the [`IngestObserver`] with their line number.
//! A store failure stops the run and reports how many rows were already committed.

use crate::batch::BatchAccumulator;
use crate::error::{IngestError, Result};
use crate::store::{RecordStore, StoreWriter};
use crate::validator::{self, SkipReason};
use std::io::BufRead;
use std::time::{Duration, Instant};
use tracing::{info, info_span, trace, warn};

/// Position of the pipeline in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Reading,
    FlushingBatch,
    FlushingFinalBatch,
    Done,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestionSummary {
    /// Records upserted, duplicates included
    pub total_records_written: u64,
    /// Wall-clock time of the run
    pub elapsed: Duration,
    pub lines_read: u64,
    pub blank_lines: u64,
    /// Malformed JSON and invalid ranks
    pub rejected_lines: u64,
    /// Lines dropped by the wallet format filter
    pub filtered_lines: u64,
    pub batches_flushed: u64,
}

/// Receives per-line rejections and progress while a run is in flight
pub trait IngestObserver {
    /// A reportable line was skipped
    fn on_rejected(&mut self, reason: &SkipReason);

    /// A batch was committed; `rows_committed` is the running total
    fn on_progress(&mut self, rows_committed: u64);

    fn on_finished(&mut self, _summary: &IngestionSummary) {}
}

/// Observer that writes to the `tracing` diagnostic stream
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl IngestObserver for LogObserver {
    fn on_rejected(&mut self, reason: &SkipReason) {
        warn!(line = reason.line(), "{}", reason);
    }

    fn on_progress(&mut self, rows_committed: u64) {
        info!(rows_committed, "[ingest] {} rows...", rows_committed);
    }
}

/// Single-threaded validate, batch and flush loop
pub struct IngestionPipeline<S: RecordStore, O: IngestObserver> {
    writer: StoreWriter<S>,
    accumulator: BatchAccumulator,
    observer: O,
    state: PipelineState,
}

impl<S: RecordStore, O: IngestObserver> IngestionPipeline<S, O> {
    pub fn new(writer: StoreWriter<S>, commit_every: usize, observer: O) -> Self {
        Self {
            writer,
            accumulator: BatchAccumulator::new(commit_every),
            observer,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn writer(&self) -> &StoreWriter<S> {
        &self.writer
    }

    pub fn into_writer(self) -> StoreWriter<S> {
        self.writer
    }

    /// Ingest every line of `reader`
    ///
    /// Lines are numbered from 1, blank lines included.
    pub fn run<R: BufRead>(&mut self, mut reader: R) -> Result<IngestionSummary> {
        let _span = info_span!("ingest", commit_every = self.accumulator.threshold()).entered();
        let started = Instant::now();
        let mut summary = IngestionSummary::default();

        self.transition(PipelineState::Reading);
        self.writer
            .ensure_schema()
            .map_err(|source| IngestError::Store {
                rows_committed: 0,
                source,
            })?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| IngestError::Input {
                    line: summary.lines_read + 1,
                    rows_committed: summary.total_records_written,
                    source,
                })?;
            if read == 0 {
                break;
            }

            summary.lines_read += 1;
            let line = summary.lines_read;

            let outcome = match std::str::from_utf8(&buf) {
                Ok(text) => validator::validate(text, line),
                Err(e) => Err(SkipReason::MalformedJson {
                    line,
                    message: format!("invalid UTF-8: {e}"),
                }),
            };

            match outcome {
                Ok(record) => {
                    self.accumulator.append(record);
                    if self.accumulator.is_full() {
                        self.flush(PipelineState::FlushingBatch, &mut summary)?;
                        self.transition(PipelineState::Reading);
                    }
                },
                Err(SkipReason::Blank) => summary.blank_lines += 1,
                Err(SkipReason::InvalidWalletFormat) => summary.filtered_lines += 1,
                Err(reason) => {
                    summary.rejected_lines += 1;
                    self.observer.on_rejected(&reason);
                },
            }
        }

        if !self.accumulator.is_empty() {
            self.flush(PipelineState::FlushingFinalBatch, &mut summary)?;
        }

        self.transition(PipelineState::Done);
        summary.elapsed = started.elapsed();

        info!(
            rows = summary.total_records_written,
            lines = summary.lines_read,
            rejected = summary.rejected_lines,
            filtered = summary.filtered_lines,
            batches = summary.batches_flushed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Ingestion complete"
        );
        self.observer.on_finished(&summary);

        Ok(summary)
    }

    fn flush(&mut self, state: PipelineState, summary: &mut IngestionSummary) -> Result<()> {
        self.transition(state);

        let batch = self.accumulator.drain();
        let written = self
            .writer
            .flush(batch)
            .map_err(|source| IngestError::Store {
                rows_committed: summary.total_records_written,
                source,
            })?;

        summary.total_records_written += written as u64;
        summary.batches_flushed += 1;
        self.observer.on_progress(summary.total_records_written);

        Ok(())
    }

    fn transition(&mut self, next: PipelineState) {
        trace!(from = ?self.state, to = ?next, "Pipeline state change");
        self.state = next;
    }
}
