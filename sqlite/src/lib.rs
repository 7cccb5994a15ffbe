//! SQLite document store for record codecs.
//!
//! [`SqliteStore`] implements [`DocumentStore`](record_codec_db::DocumentStore)
//! over a single `{prefix}documents` table holding JSON bodies, so a
//! [`TypedCollection`](record_codec_db::TypedCollection) can sit on top of it
//! exactly as on the in-memory store. [`Migration`] manages the table's
//! lifecycle and seeds it from fixture directories.
//!
//! # Table prefix customization
//!
//! Table and index names are prefixed with a configurable string, allowing
//! multiple isolated stores within the same SQLite database. Prefixes must
//! contain only ASCII alphanumeric characters and underscores.

mod error;
mod migration;
mod schema;
mod store;

pub use error::{Result, SqliteError};
pub use migration::{Migration, MigrationStatus, SeedReport};
pub use schema::{generate_drop_sql, generate_schema_sql};
pub use store::SqliteStore;
