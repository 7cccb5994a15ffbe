//! Migration lifecycle operations for the documents table.
//!
//! Provides [`Migration`] for creating, dropping, seeding, and refreshing
//! the table. All mutation operations use transactions.
//!
//! # Example
//!
//! ```no_run
//! use record_codec_sqlite::Migration;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("records.db").unwrap();
//! let mut migration = Migration::new(conn, "rc_").unwrap();
//!
//! migration.up().unwrap();
//! let report = migration.seed("fixtures/").unwrap();
//! println!("{} inserted, {} replaced", report.inserted, report.replaced);
//!
//! let status = migration.status().unwrap();
//! for (collection, count) in &status.collections {
//!     println!("{collection}: {count}");
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use record_codec_db::FixtureSet;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::error::{Result, SqliteError};
use crate::schema::{documents_table, generate_drop_sql, generate_schema_sql, validate_prefix};

/// Manages the lifecycle of the documents table.
///
/// All mutation operations use transactions; either every change succeeds
/// or none is applied.
pub struct Migration {
    conn: Connection,
    prefix: String,
}

impl Migration {
    /// Creates a migration manager for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix contains invalid characters.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self { conn, prefix })
    }

    /// Creates the table and index. Safe to call repeatedly.
    pub fn up(&mut self) -> Result<()> {
        let sql = generate_schema_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to create tables: {e}")))?;
        tx.commit()?;
        debug!(prefix = %self.prefix, "migrated up");
        Ok(())
    }

    /// Drops the table. Safe to call when it does not exist.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.prefix)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::MigrationError(format!("failed to drop tables: {e}")))?;
        tx.commit()?;
        debug!(prefix = %self.prefix, "migrated down");
        Ok(())
    }

    /// Whether the table exists, and how many documents each collection holds.
    ///
    /// A document's collection is the part of its key before the first `/`;
    /// keys without one are counted under the empty string.
    pub fn status(&self) -> Result<MigrationStatus> {
        self.status_under("")
    }

    /// Like [`status`](Self::status), for keys written under a collection prefix.
    ///
    /// Only keys starting with `{collection_prefix}/` are counted, and the
    /// prefix is stripped before the collection segment is taken, so
    /// `tenant/devices/d1` counts toward `devices` under `tenant`. An empty
    /// prefix counts every key.
    pub fn status_under(&self, collection_prefix: &str) -> Result<MigrationStatus> {
        if !self.tables_exist()? {
            return Ok(MigrationStatus::default());
        }

        let namespace = match collection_prefix.trim_end_matches('/') {
            "" => String::new(),
            prefix => format!("{prefix}/"),
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT CASE WHEN instr(rest, '/') > 0 THEN substr(rest, 1, instr(rest, '/') - 1) ELSE '' END AS collection,
                    COUNT(*)
             FROM (SELECT substr(key, length(?1) + 1) AS rest
                   FROM {}
                   WHERE substr(key, 1, length(?1)) = ?1)
             GROUP BY collection",
            documents_table(&self.prefix)
        ))?;
        let rows = stmt.query_map(params![namespace], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut status = MigrationStatus {
            tables_exist: true,
            ..MigrationStatus::default()
        };
        for row in rows {
            let (collection, count) = row?;
            let count = count as usize;
            status.document_count += count;
            status.collections.insert(collection, count);
        }
        debug!(namespace = %namespace, documents = status.document_count, "collected status");
        Ok(status)
    }

    /// Seeds the table from a directory of JSON fixture files.
    ///
    /// Loads documents with [`FixtureSet::from_dir`] and writes them all
    /// within a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::LoaderError`] if the directory cannot be read,
    /// or [`SqliteError::DatabaseError`] if insertion fails.
    pub fn seed(&mut self, source_dir: impl AsRef<Path>) -> Result<SeedReport> {
        let fixtures = FixtureSet::from_dir(source_dir)?;
        self.seed_fixtures(&fixtures)
    }

    /// Writes an already loaded fixture set within a single transaction.
    pub fn seed_fixtures(&mut self, fixtures: &FixtureSet) -> Result<SeedReport> {
        let table = documents_table(&self.prefix);
        let tx = self.conn.transaction()?;
        let mut report = SeedReport::default();

        for document in fixtures.documents() {
            let exists: i64 = tx.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE key = ?1"),
                [&document.key],
                |row| row.get(0),
            )?;
            let body = serde_json::to_string(&document.body)?;
            tx.execute(
                &format!(
                    "INSERT INTO {table} (key, body) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = datetime('now')"
                ),
                params![document.key, body],
            )?;
            if exists > 0 {
                report.replaced += 1;
            } else {
                report.inserted += 1;
            }
        }

        tx.commit()?;
        info!(
            prefix = %self.prefix,
            inserted = report.inserted,
            replaced = report.replaced,
            "seeded documents"
        );
        Ok(report)
    }

    /// Drops the table, recreates it, and seeds from the given directory.
    pub fn refresh(&mut self, source_dir: impl AsRef<Path>) -> Result<SeedReport> {
        self.down()?;
        self.up()?;
        self.seed(source_dir)
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn tables_exist(&self) -> Result<bool> {
        let table_name = documents_table(&self.prefix);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [&table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Snapshot returned by [`Migration::status`] and [`Migration::status_under`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Whether the documents table exists.
    pub tables_exist: bool,
    /// Total number of stored documents.
    pub document_count: usize,
    /// Document count per collection, in collection order.
    pub collections: BTreeMap<String, usize>,
}

/// Report of a seed operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Keys that were not stored before.
    pub inserted: usize,
    /// Keys whose body was replaced.
    pub replaced: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_new_validates_prefix() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(Migration::new(conn, "valid_prefix_").is_ok());

        let conn = Connection::open_in_memory().unwrap();
        assert!(Migration::new(conn, "").is_err());

        let conn = Connection::open_in_memory().unwrap();
        assert!(Migration::new(conn, "drop;--").is_err());
    }

    #[test]
    fn test_status_on_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        let migration = Migration::new(conn, "rc_").unwrap();
        assert_eq!(migration.status().unwrap(), MigrationStatus::default());
    }

    #[test]
    fn test_up_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let mut migration = Migration::new(conn, "rc_").unwrap();
        migration.up().unwrap();
        migration.up().unwrap();
        let status = migration.status().unwrap();
        assert!(status.tables_exist);
        assert_eq!(status.document_count, 0);
    }

    #[test]
    fn test_down_removes_table() {
        let conn = Connection::open_in_memory().unwrap();
        let mut migration = Migration::new(conn, "rc_").unwrap();
        migration.up().unwrap();
        migration.down().unwrap();
        assert!(!migration.status().unwrap().tables_exist);
        migration.down().unwrap();
    }

    #[test]
    fn test_status_groups_by_collection() {
        let conn = Connection::open_in_memory().unwrap();
        let mut migration = Migration::new(conn, "rc_").unwrap();
        migration.up().unwrap();
        migration
            .connection()
            .execute_batch(
                "INSERT INTO rc_documents (key, body) VALUES
                    ('patients/p1', '{}'), ('patients/p2', '{}'), ('devices/d1', '{}'), ('root', '1');",
            )
            .unwrap();

        let status = migration.status().unwrap();
        assert_eq!(status.document_count, 4);
        assert_eq!(
            status.collections.into_iter().collect::<Vec<_>>(),
            vec![
                (String::new(), 1),
                ("devices".to_string(), 1),
                ("patients".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_status_under_strips_collection_prefix() {
        let conn = Connection::open_in_memory().unwrap();
        let mut migration = Migration::new(conn, "rc_").unwrap();
        migration.up().unwrap();
        migration
            .connection()
            .execute_batch(
                "INSERT INTO rc_documents (key, body) VALUES
                    ('prod/patients/p1', '{}'), ('prod/patients/p2', '{}'),
                    ('prod/devices/d1', '{}'), ('staging/devices/d2', '{}'),
                    ('production/devices/d3', '{}');",
            )
            .unwrap();

        let status = migration.status_under("prod").unwrap();
        assert_eq!(status.document_count, 3);
        assert_eq!(
            status.collections.into_iter().collect::<Vec<_>>(),
            vec![("devices".to_string(), 1), ("patients".to_string(), 2)]
        );

        assert_eq!(migration.status_under("prod/").unwrap().document_count, 3);
        let everything = migration.status_under("").unwrap();
        assert_eq!(everything, migration.status().unwrap());
        assert_eq!(everything.document_count, 5);
        assert_eq!(everything.collections.get("prod"), Some(&3));
    }

    #[test]
    fn test_prefixes_are_isolated() {
        let conn = Connection::open_in_memory().unwrap();
        let mut a = Migration::new(conn, "a_").unwrap();
        a.up().unwrap();
        let mut b = Migration::new(a.into_connection(), "b_").unwrap();
        assert!(!b.status().unwrap().tables_exist);
        b.up().unwrap();
        assert!(b.status().unwrap().tables_exist);
    }
}
