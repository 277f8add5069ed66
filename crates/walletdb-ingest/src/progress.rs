//! Progress indicators for interactive runs
//!
//! The spinner draws on stderr and hides itself when stderr is not a terminal, so
//! piped and scripted runs only see the log lines.

use crate::pipeline::{IngestObserver, IngestionSummary, LogObserver};
use crate::validator::SkipReason;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Create a spinner for the row counter
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Observer that keeps a spinner updated and forwards everything to [`LogObserver`]
pub struct SpinnerObserver {
    spinner: ProgressBar,
    inner: LogObserver,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        Self {
            spinner: create_spinner("Ingesting wallets..."),
            inner: LogObserver,
        }
    }
}

impl Default for SpinnerObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestObserver for SpinnerObserver {
    fn on_rejected(&mut self, reason: &SkipReason) {
        let inner = &mut self.inner;
        self.spinner.suspend(|| inner.on_rejected(reason));
    }

    fn on_progress(&mut self, rows_committed: u64) {
        self.spinner
            .set_message(format!("{rows_committed} rows committed"));
        let inner = &mut self.inner;
        self.spinner.suspend(|| inner.on_progress(rows_committed));
    }

    fn on_finished(&mut self, summary: &IngestionSummary) {
        self.spinner.finish_and_clear();
        self.inner.on_finished(summary);
    }
}

/// Format a rows-per-second rate for the final report
pub fn format_rate(rows: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        return "n/a".to_string();
    }

    let rate = rows as f64 / secs;
    if rate >= 1_000_000.0 {
        format!("{:.2}M rows/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.1}k rows/s", rate / 1_000.0)
    } else {
        format!("{rate:.0} rows/s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(10, Duration::ZERO), "n/a");
        assert_eq!(format_rate(500, Duration::from_secs(1)), "500 rows/s");
        assert_eq!(format_rate(25_000, Duration::from_secs(2)), "12.5k rows/s");
        assert_eq!(format_rate(3_000_000, Duration::from_secs(1)), "3.00M rows/s");
    }

    #[test]
    fn test_spinner_observer_finishes() {
        let mut observer = SpinnerObserver::new();
        observer.on_progress(5000);
        observer.on_finished(&IngestionSummary::default());
        assert!(observer.spinner.is_finished());
    }
}
