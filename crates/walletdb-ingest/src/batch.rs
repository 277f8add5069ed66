//! Record buffering between validation and storage

use crate::validator::NormalizedRecord;

/// Records awaiting one atomic flush, in append order
pub type Batch = Vec<NormalizedRecord>;

/// Buffers normalized records until the flush threshold is reached
///
/// Duplicate wallets are kept; the store applies them in order so the last one wins.
#[derive(Debug)]
pub struct BatchAccumulator {
    records: Batch,
    threshold: usize,
}

impl BatchAccumulator {
    /// Create an accumulator that reports full at `threshold` records (minimum 1)
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            records: Vec::with_capacity(threshold),
            threshold,
        }
    }

    pub fn append(&mut self, record: NormalizedRecord) {
        self.records.push(record);
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.threshold
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Hand over the buffered records and start a fresh batch
    pub fn drain(&mut self) -> Batch {
        std::mem::replace(&mut self.records, Vec::with_capacity(self.threshold))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validator::validate;

    fn record(n: usize) -> NormalizedRecord {
        let line = format!(r#"{{"wallet":"0x{n:040x}","rank":{n}}}"#);
        validate(&line, 1).unwrap()
    }

    #[test]
    fn test_fills_at_threshold() {
        let mut acc = BatchAccumulator::new(3);
        assert!(acc.is_empty());

        acc.append(record(1));
        acc.append(record(2));
        assert!(!acc.is_full());

        acc.append(record(3));
        assert!(acc.is_full());
        assert_eq!(acc.len(), 3);
    }

    #[test]
    fn test_drain_preserves_order_and_clears() {
        let mut acc = BatchAccumulator::new(10);
        for n in 1..=4 {
            acc.append(record(n));
        }

        let batch = acc.drain();
        let ranks: Vec<i64> = batch.iter().map(NormalizedRecord::rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!(acc.is_empty());
        assert!(!acc.is_full());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut acc = BatchAccumulator::new(10);
        acc.append(record(7));
        acc.append(record(7));
        assert_eq!(acc.drain().len(), 2);
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let mut acc = BatchAccumulator::new(0);
        assert_eq!(acc.threshold(), 1);
        acc.append(record(1));
        assert!(acc.is_full());
    }
}
