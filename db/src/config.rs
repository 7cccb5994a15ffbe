//! Codec and storage configuration.
//!
//! Loaded from YAML; every section has defaults, so a minimal file only
//! needs `version`.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! decode:
//!   max_depth: 64
//! store:
//!   collection_prefix: "prod"
//! sqlite:
//!   path: "records.db"
//!   table_prefix: "rc_"
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use record_codec_core::{DEFAULT_MAX_DEPTH, DecodeOptions};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Decode settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Recursive nesting limit; `null` disables the guard.
    pub max_depth: Option<usize>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prepended to every collection name, e.g. `prod` gives `prod/patients`.
    pub collection_prefix: String,
}

/// SQLite backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: PathBuf,
    /// Prefix for table names; alphanumerics and `_` only.
    pub table_prefix: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("records.db"),
            table_prefix: "rc_".to_string(),
        }
    }
}

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// # use record_codec_db::CodecConfig;
/// let config: CodecConfig = serde_yaml::from_str("version: \"1.0\"").unwrap();
/// assert_eq!(config.decode_options().max_depth, Some(128));
/// assert_eq!(config.collection("patients"), "patients");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            decode: DecodeConfig::default(),
            store: StoreConfig::default(),
            sqlite: SqliteConfig::default(),
        }
    }
}

impl CodecConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::PersistenceError::IoError) if the file
    /// cannot be read, or [`YamlError`](crate::PersistenceError::YamlError)
    /// if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Options for every decode call made under this configuration.
    pub fn decode_options(&self) -> DecodeOptions {
        match self.decode.max_depth {
            Some(limit) => DecodeOptions::default().with_max_depth(limit),
            None => DecodeOptions::unbounded(),
        }
    }

    /// The store collection name for `name`.
    pub fn collection(&self, name: &str) -> String {
        if self.store.collection_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.store.collection_prefix, name)
        }
    }
}
