//! Loading fixture documents from disk.
//!
//! Fixtures are raw documents to seed a store with, either a directory tree
//! of `*.json` files or a single bundle file.
//!
//! ```no_run
//! use record_codec_db::{FixtureSet, MemoryStore};
//!
//! // `fixtures/patients/p1.json` is stored under `patients/p1`
//! let fixtures = FixtureSet::from_dir("fixtures/").unwrap();
//! let store = MemoryStore::new();
//! fixtures.seed(&store).unwrap();
//! ```

use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{PersistenceError, Result};
use crate::store::{Document, DocumentStore, validate_key};

/// Describes where a [`FixtureSet`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureSource {
    /// A directory tree of JSON files, one document per file.
    Directory(PathBuf),
    /// One JSON object mapping keys to documents.
    Bundle(PathBuf),
}

/// Documents keyed by store key, in key order.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    documents: BTreeMap<String, Value>,
    source: FixtureSource,
}

impl FixtureSet {
    /// Loads every `*.json` file below `path`.
    ///
    /// A file's key is its path relative to `path`, without the extension
    /// and with `/` separators.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::IoError`] if the tree cannot be read,
    /// [`PersistenceError::JsonError`] if a file is not valid JSON, or
    /// [`PersistenceError::InvalidKey`] for a path that is not valid UTF-8.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        let mut documents = BTreeMap::new();
        collect_dir(root, root, &mut documents)?;
        debug!(root = %root.display(), documents = documents.len(), "loaded fixture directory");
        Ok(Self {
            documents,
            source: FixtureSource::Directory(root.to_path_buf()),
        })
    }

    /// Loads a bundle: a JSON object whose keys are store keys.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let documents: BTreeMap<String, Value> = serde_json::from_reader(reader)?;
        for key in documents.keys() {
            validate_key(key)?;
        }
        Ok(Self {
            documents,
            source: FixtureSource::Bundle(path.to_path_buf()),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.documents.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Every fixture as a [`Document`], in key order.
    pub fn documents(&self) -> Vec<Document> {
        self.documents
            .iter()
            .map(|(key, body)| Document {
                key: key.clone(),
                body: body.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn source(&self) -> &FixtureSource {
        &self.source
    }

    /// Writes every fixture into `store`, replacing existing documents.
    ///
    /// Returns the number of documents written.
    pub fn seed<S: DocumentStore + ?Sized>(&self, store: &S) -> Result<usize> {
        for (key, body) in &self.documents {
            store.put(key, body)?;
        }
        Ok(self.documents.len())
    }
}

fn collect_dir(root: &Path, dir: &Path, documents: &mut BTreeMap<String, Value>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_dir(root, &path, documents)?;
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let key = fixture_key(root, &path)?;
        let file = std::fs::File::open(&path)?;
        let body: Value = serde_json::from_reader(BufReader::new(file))?;
        documents.insert(key, body);
    }
    Ok(())
}

fn fixture_key(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let mut segments = Vec::new();
    for component in relative.components() {
        let segment = component.as_os_str().to_str().ok_or_else(|| {
            PersistenceError::InvalidKey(format!("non UTF-8 fixture path {}", path.display()))
        })?;
        segments.push(segment.to_string());
    }
    let key = segments.join("/");
    validate_key(&key)?;
    Ok(key)
}
