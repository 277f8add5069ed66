//! Property-based tests for validation, batching and upsert semantics

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;
use walletdb_ingest::{
    validator, IngestionPipeline, LogObserver, NormalizedRecord, RecordStore, StoreError,
    StoreWriter,
};

/// In-memory store keyed by wallet that records the size of every batch
#[derive(Default)]
struct MapStore {
    rows: BTreeMap<String, (i64, String, String)>,
    batch_sizes: Vec<usize>,
}

impl RecordStore for MapStore {
    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn upsert_batch(&mut self, batch: &[NormalizedRecord]) -> Result<usize, StoreError> {
        for record in batch {
            self.rows.insert(
                record.wallet().to_string(),
                (
                    record.rank(),
                    record.lifetime_json().to_string(),
                    record.months_json().to_string(),
                ),
            );
        }
        self.batch_sizes.push(batch.len());
        Ok(batch.len())
    }
}

#[derive(Debug, Clone)]
enum Line {
    Valid { wallet: String, rank: i64 },
    ShortWallet,
    Malformed(String),
    Blank,
}

impl Line {
    fn render(&self) -> String {
        match self {
            Line::Valid { wallet, rank } => {
                format!(r#"{{"wallet":"{}","rank":{},"lifetime":{{"z":1,"a":2}}}}"#, wallet, rank)
            },
            Line::ShortWallet => r#"{"wallet":"0xabc","rank":1}"#.to_string(),
            Line::Malformed(junk) => format!("{{{}", junk),
            Line::Blank => String::new(),
        }
    }
}

fn wallet_strategy() -> impl Strategy<Value = String> {
    // A small alphabet forces duplicate wallets
    "0x[aAbB]{40}"
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        6 => (wallet_strategy(), -1000i64..1000).prop_map(|(wallet, rank)| Line::Valid { wallet, rank }),
        1 => Just(Line::ShortWallet),
        1 => "[a-z]{0,6}".prop_map(Line::Malformed),
        1 => Just(Line::Blank),
    ]
}

fn render(lines: &[Line]) -> String {
    lines.iter().map(Line::render).collect::<Vec<_>>().join("\n")
}

fn expected_rows(lines: &[Line]) -> BTreeMap<String, i64> {
    let mut rows = BTreeMap::new();
    for line in lines {
        if let Line::Valid { wallet, rank } = line {
            rows.insert(wallet.to_lowercase(), *rank);
        }
    }
    rows
}

fn ingest(input: &str, commit_every: usize) -> (MapStore, u64) {
    let mut pipeline =
        IngestionPipeline::new(StoreWriter::new(MapStore::default()), commit_every, LogObserver);
    let summary = pipeline.run(Cursor::new(input.as_bytes().to_vec())).unwrap();
    (pipeline.into_writer().into_inner(), summary.total_records_written)
}

proptest! {
    #[test]
    fn prop_last_occurrence_wins(lines in prop::collection::vec(line_strategy(), 0..60)) {
        let (store, written) = ingest(&render(&lines), 7);

        let valid = lines.iter().filter(|l| matches!(l, Line::Valid { .. })).count() as u64;
        prop_assert_eq!(written, valid);

        let stored: BTreeMap<String, i64> =
            store.rows.iter().map(|(w, (rank, _, _))| (w.clone(), *rank)).collect();
        prop_assert_eq!(stored, expected_rows(&lines));

        for (_, lifetime, months) in store.rows.values() {
            prop_assert_eq!(lifetime.as_str(), r#"{"a":2,"z":1}"#);
            prop_assert_eq!(months.as_str(), "{}");
        }
    }

    #[test]
    fn prop_batch_size_does_not_change_result(
        lines in prop::collection::vec(line_strategy(), 0..60),
        commit_every in 1usize..12,
    ) {
        let input = render(&lines);
        let (single, _) = ingest(&input, 1);
        let (batched, written) = ingest(&input, commit_every);

        prop_assert_eq!(&single.rows, &batched.rows);
        prop_assert_eq!(batched.batch_sizes.iter().sum::<usize>() as u64, written);

        if let Some((last, full)) = batched.batch_sizes.split_last() {
            prop_assert!(full.iter().all(|&n| n == commit_every));
            prop_assert!(*last >= 1 && *last <= commit_every);
        }
    }

    #[test]
    fn prop_validate_never_panics(raw in "\\PC{0,80}", line in 1u64..10_000) {
        match validator::validate(&raw, line) {
            Ok(record) => {
                prop_assert_eq!(record.wallet().chars().count(), 42);
                prop_assert!(record.wallet().starts_with("0x"));
            },
            Err(reason) => {
                if let Some(reported) = reason.line() {
                    prop_assert_eq!(reported, line);
                }
            },
        }
    }

    #[test]
    fn prop_generated_wallets_are_normalized(wallet in "0[xX][0-9a-fA-F]{40}", rank in any::<i32>()) {
        let raw = format!(r#"{{"rank":{},"wallet":"{}"}}"#, rank, wallet);
        let record = validator::validate(&raw, 1).unwrap();

        prop_assert_eq!(record.wallet(), wallet.to_lowercase());
        prop_assert_eq!(record.rank(), i64::from(rank));
    }
}
