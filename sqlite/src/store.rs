//! A [`DocumentStore`] backed by one SQLite table.
//!
//! # Example
//!
//! ```no_run
//! use record_codec_db::{DocumentStore, QueryFilter};
//! use record_codec_sqlite::{Migration, SqliteStore};
//! use rusqlite::Connection;
//! use serde_json::json;
//!
//! let mut migration = Migration::new(Connection::open("records.db").unwrap(), "rc_").unwrap();
//! migration.up().unwrap();
//!
//! let store = SqliteStore::new(migration.into_connection(), "rc_").unwrap();
//! store.put("devices/d1", &json!({"platform": "iOS"})).unwrap();
//! let devices = store.query(&QueryFilter::all().with_prefix("devices/")).unwrap();
//! assert_eq!(devices.len(), 1);
//! ```

use std::sync::{Mutex, MutexGuard};

use record_codec_db::{self as db, Document, DocumentStore, QueryFilter, validate_key};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SqliteError};
use crate::schema::{documents_table, validate_prefix};

/// Documents stored as JSON text in `{prefix}documents`.
///
/// The table must exist; see [`Migration::up`](crate::Migration::up).
/// Writes replace the whole body and refresh `updated_at`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteStore {
    /// Wraps `conn`, reading and writing the table for `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
    pub fn new(conn: Connection, prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: documents_table(prefix),
        })
    }

    /// Consumes the store and returns the underlying connection.
    pub fn into_connection(self) -> Result<Connection> {
        self.conn.into_inner().map_err(|_| SqliteError::Poisoned)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SqliteError::Poisoned)
    }

    fn read(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                &format!("SELECT body FROM {} WHERE key = ?1", self.table),
                [key],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|text| parse_body(key, &text)).transpose()
    }

    fn write(&self, key: &str, record: &Value) -> Result<()> {
        let body = serde_json::to_string(record)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} (key, body) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = datetime('now')",
                self.table
            ),
            params![key, body],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(&format!("DELETE FROM {} WHERE key = ?1", self.table), [key])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn select(&self, filter: &QueryFilter) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT key, body FROM {} WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            self.table
        ))?;
        let rows = stmt.query_map([filter.prefix().unwrap_or("")], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (key, text) = row?;
            let body = parse_body(&key, &text)?;
            if filter.matches_body(&body) {
                documents.push(Document { key, body });
            }
        }
        Ok(documents)
    }
}

fn parse_body(key: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|source| SqliteError::MalformedBody {
        key: key.to_string(),
        source,
    })
}

impl DocumentStore for SqliteStore {
    fn get(&self, key: &str) -> db::Result<Option<Value>> {
        validate_key(key)?;
        Ok(self.read(key)?)
    }

    fn put(&self, key: &str, record: &Value) -> db::Result<()> {
        validate_key(key)?;
        debug!(table = %self.table, key, "upsert");
        Ok(self.write(key, record)?)
    }

    fn delete(&self, key: &str) -> db::Result<bool> {
        validate_key(key)?;
        debug!(table = %self.table, key, "delete");
        Ok(self.remove(key)?)
    }

    fn query(&self, filter: &QueryFilter) -> db::Result<Vec<Document>> {
        Ok(self.select(filter)?)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
