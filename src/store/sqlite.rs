// src/store/sqlite.rs

//! SQLite-backed [`KvStore`]
//!
//! Many wrapper processes share one database file while a build compiles
//! packages in parallel. WAL mode lets readers proceed while one writer holds
//! the lock; writers take the lock up front with `BEGIN IMMEDIATE` and wait
//! at most `busy_timeout` for it. A writer that gives up surfaces as
//! [`Error::AcquisitionTimeout`](crate::Error::AcquisitionTimeout).

use super::{schema, KeyPath, KvStore};
use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Key-value store in a single SQLite database file
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Default bound on waiting for another process's write lock
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (creating if needed) the store at `path`
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::InitError(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(timeout)?;
        // journal_mode answers with the mode now in effect
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Store journal mode: {}", mode);
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        schema::migrate(&mut conn)?;

        debug!("Opened cache store at {}", path.display());

        Ok(Self { conn })
    }
}

impl KvStore for SqliteStore {
    fn put(&mut self, key: &KeyPath, value: &[u8]) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        upsert(&tx, key, value)?;
        tx.commit()?;
        Ok(())
    }

    fn put_batch(&mut self, entries: &[(KeyPath, Vec<u8>)]) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (key, value) in entries {
            upsert(&tx, key, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, key: &KeyPath) -> Result<Vec<u8>> {
        select(&self.conn, key)
    }

    fn get_many(&self, keys: &[KeyPath]) -> Result<Vec<Vec<u8>>> {
        // A deferred transaction pins one read snapshot for every select
        let tx = self.conn.unchecked_transaction()?;
        let values = keys
            .iter()
            .map(|key| select(&tx, key))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(values)
    }
}

fn select(conn: &Connection, key: &KeyPath) -> Result<Vec<u8>> {
    let value: Option<Vec<u8>> = conn
        .query_row(
            "SELECT value FROM entries WHERE key = ?1",
            [key.encode()],
            |row| row.get(0),
        )
        .optional()?;

    value.ok_or_else(|| Error::NotFound(key.encode()))
}

fn upsert(conn: &Connection, key: &KeyPath, value: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT INTO entries (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        params![key.encode(), value],
    )?;
    Ok(())
}
