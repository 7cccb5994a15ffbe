//! SQL generation with customizable table prefixes.
//!
//! Documents live in one table, `{prefix}documents`, keyed by the full store
//! key (`collection/id`). The body is JSON text. Prefixes must contain only
//! alphanumeric characters and underscores, which allows several isolated
//! stores (e.g. `prod_`, `test_`) in one SQLite database.

use crate::error::{Result, SqliteError};

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Name of the documents table for `prefix`.
pub(crate) fn documents_table(prefix: &str) -> String {
    format!("{prefix}documents")
}

/// Generates the `CREATE` statements for the documents table and its index.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix contains characters
/// other than alphanumerics and underscores, or if it is empty.
pub fn generate_schema_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}documents (
    key TEXT PRIMARY KEY NOT NULL,
    body TEXT NOT NULL CHECK (json_valid(body)),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_{prefix}documents_updated ON {prefix}documents(updated_at);
"#,
        prefix = prefix
    );

    Ok(sql)
}

/// Generates SQL to drop the documents table.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;
    Ok(format!("DROP TABLE IF EXISTS {prefix}documents;\n"))
}
