//! Input file access
//!
//! Plain `.jsonl` files are read through a buffered reader; `.gz` files are gunzipped on
//! the fly (multi-member archives included).

use crate::error::{IngestError, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Open `path` for line-by-line reading
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|source| IngestError::OpenInput {
        path: path.display().to_string(),
        source,
    })?;

    if is_gzip(path) {
        debug!(path = %path.display(), "Reading gzip-compressed input");
        Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER_BYTES,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, file)))
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}
