//! SQLite-backed wallet document store

use super::{schema, RecordStore};
use crate::error::StoreError;
use crate::validator::NormalizedRecord;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

/// Last-write-wins upsert; all non-key columns are replaced together
const UPSERT_SQL: &str = r#"
    INSERT INTO wallet_doc (wallet, rank, lifetime_json, months_json)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(wallet) DO UPDATE SET
        rank = excluded.rank,
        lifetime_json = excluded.lifetime_json,
        months_json = excluded.months_json
"#;

/// Wallet store on a single SQLite connection held for the process lifetime
pub struct SqliteStore {
    conn: Connection,
    location: String,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let location = path.as_ref().display().to_string();
        let conn = Connection::open(path.as_ref()).map_err(|source| StoreError::Open {
            path: location.clone(),
            source,
        })?;

        Self::from_connection(conn, location)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: ":memory:".to_string(),
            source,
        })?;

        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, location: String) -> Result<Self, StoreError> {
        let journal_mode = schema::configure_durability(&conn)?;
        debug!(location = %location, journal_mode = %journal_mode, "Opened wallet store");

        Ok(Self { conn, location })
    }

    /// Path the store was opened from
    pub fn location(&self) -> &str {
        &self.location
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteStore {
    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        schema::init_schema(&self.conn)
    }

    fn upsert_batch(&mut self, batch: &[NormalizedRecord]) -> Result<usize, StoreError> {
        // Dropping the transaction on an early return rolls the whole batch back
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
            for record in batch {
                stmt.execute(params![
                    record.wallet(),
                    record.rank(),
                    record.lifetime_json(),
                    record.months_json(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(batch.len())
    }
}
