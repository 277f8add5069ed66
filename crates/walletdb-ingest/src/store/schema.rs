//! SQLite schema for the wallet document store

use crate::error::StoreError;
use rusqlite::Connection;

/// Create the `wallet_doc` table and its `idx_wallet_rank` index if they do not exist
pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS wallet_doc (
            wallet        TEXT PRIMARY KEY,
            rank          INTEGER NOT NULL,
            lifetime_json TEXT    NOT NULL,
            months_json   TEXT    NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_wallet_rank ON wallet_doc(rank)",
        [],
    )?;

    Ok(())
}

/// Switch to write-ahead logging with relaxed sync; returns the journal mode in effect
///
/// In-memory databases report `memory` since they cannot use WAL.
pub fn configure_durability(conn: &Connection) -> Result<String, StoreError> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(mode)
}
