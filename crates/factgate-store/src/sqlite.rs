//! SQLite implementation of the KeyTable trait.
//!
//! This is the durable key table. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, TransactionBehavior};

use factgate_core::Identity;

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{KeyRecord, KeyTable};

/// SQLite-based key table.
///
/// Thread-safe via internal Mutex. Every insert runs in an immediate
/// transaction, so separate processes sharing the file also serialize on
/// the write lock.
pub struct SqliteKeyTable {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyTable {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of rows stored for an identity.
    pub async fn row_count(&self, identity: &Identity) -> Result<usize> {
        let identity = identity.clone();
        self.run(move |conn| Ok(select_rows(conn, &identity)?.len()))
            .await
    }

    /// Execute a blocking operation on the connection.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }
}

// Helper to convert a row to a KeyRecord
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<KeyRecord> {
    Ok(KeyRecord {
        provider: row.get("provider")?,
        user_id: row.get("user_id")?,
        public_key: row.get("public_key")?,
        private_key: row.get("private_key")?,
    })
}

fn select_rows(conn: &Connection, identity: &Identity) -> Result<Vec<KeyRecord>> {
    let mut stmt = conn.prepare(
        "SELECT provider, user_id, public_key, private_key
         FROM identities WHERE provider = ?1 AND user_id = ?2",
    )?;
    let rows = stmt
        .query_map(params![identity.provider, identity.id], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn single_row(mut rows: Vec<KeyRecord>, identity: &Identity) -> Result<Option<KeyRecord>> {
    if rows.len() > 1 {
        return Err(StoreError::DuplicateKey {
            provider: identity.provider.clone(),
            user_id: identity.id.clone(),
        });
    }
    Ok(rows.pop())
}

#[async_trait]
impl KeyTable for SqliteKeyTable {
    async fn find_key(&self, identity: &Identity) -> Result<Option<KeyRecord>> {
        let identity = identity.clone();
        self.run(move |conn| {
            let rows = select_rows(conn, &identity)?;
            single_row(rows, &identity)
        })
        .await
    }

    async fn insert_if_absent(&self, record: KeyRecord) -> Result<KeyRecord> {
        self.run(move |conn| {
            let identity = record.identity();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(existing) = single_row(select_rows(&tx, &identity)?, &identity)? {
                return Ok(existing);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO identities
                    (provider, user_id, public_key, private_key, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.provider,
                    record.user_id,
                    record.public_key,
                    record.private_key,
                    now_millis(),
                ],
            )?;

            let stored = single_row(select_rows(&tx, &identity)?, &identity)?;
            tx.commit()?;

            if inserted == 1 {
                tracing::debug!(identity = %identity, "issued key pair");
            }
            stored.ok_or(StoreError::Database(rusqlite::Error::QueryReturnedNoRows))
        })
        .await
    }
}
