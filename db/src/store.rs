//! The document store boundary and an in-memory implementation.
//!
//! A store holds raw JSON documents under string keys. Collections are key
//! prefixes (`patients/p1`), so one store can back any number of them.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PersistenceError, Result};

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: String,
    pub body: Value,
}

/// Selects documents by key prefix and top-level field equality.
///
/// Every constraint must hold; an empty filter selects everything.
///
/// # Examples
///
/// ```
/// use record_codec_db::{Document, QueryFilter};
/// use serde_json::json;
///
/// let filter = QueryFilter::all()
///     .with_prefix("devices/")
///     .where_eq("platform", "iOS");
/// let doc = Document {
///     key: "devices/d1".into(),
///     body: json!({"platform": "iOS", "notificationToken": "t"}),
/// };
/// assert!(filter.matches(&doc));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    prefix: Option<String>,
    fields: Vec<(String, Value)>,
}

impl QueryFilter {
    /// A filter that selects every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the filter to keys starting with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Requires the top-level `field` of the body to equal `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    /// Re-roots the prefix under `collection/`, keeping field constraints.
    pub fn within(mut self, collection: &str) -> Self {
        let relative = self.prefix.take().unwrap_or_default();
        self.prefix = Some(format!("{collection}/{relative}"));
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Returns `true` if the key matches the prefix (or there is none).
    pub fn matches_key(&self, key: &str) -> bool {
        self.prefix
            .as_deref()
            .is_none_or(|prefix| key.starts_with(prefix))
    }

    /// Returns `true` if every field constraint holds for `body`.
    pub fn matches_body(&self, body: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, value)| body.get(field) == Some(value))
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.matches_key(&document.key) && self.matches_body(&document.body)
    }
}

/// Raw document storage.
///
/// Implementations perform the I/O; codecs are applied by
/// [`TypedCollection`](crate::TypedCollection) on top.
pub trait DocumentStore {
    /// The document under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Inserts or replaces the document under `key`.
    fn put(&self, key: &str, record: &Value) -> Result<()>;

    /// Removes the document under `key`; returns whether one existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Every document selected by `filter`, ordered by key.
    fn query(&self, filter: &QueryFilter) -> Result<Vec<Document>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, record: &Value) -> Result<()> {
        (**self).put(key, record)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn query(&self, filter: &QueryFilter) -> Result<Vec<Document>> {
        (**self).query(filter)
    }
}

/// Rejects keys no backend can store.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.trim() != key {
        return Err(PersistenceError::InvalidKey(format!(
            "'{key}': keys must be non-empty without surrounding whitespace"
        )));
    }
    Ok(())
}

/// An ordered, in-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Value>>,
}

fn poisoned<T>(_: T) -> PersistenceError {
    PersistenceError::Backend("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> Result<usize> {
        Ok(self.documents.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.documents.read().map_err(poisoned)?.get(key).cloned())
    }

    fn put(&self, key: &str, record: &Value) -> Result<()> {
        validate_key(key)?;
        self.documents
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self
            .documents
            .write()
            .map_err(poisoned)?
            .remove(key)
            .is_some())
    }

    fn query(&self, filter: &QueryFilter) -> Result<Vec<Document>> {
        let documents = self.documents.read().map_err(poisoned)?;
        let candidates: Box<dyn Iterator<Item = (&String, &Value)> + '_> = match filter.prefix() {
            Some(prefix) => Box::new(
                documents
                    .range(prefix.to_string()..)
                    .take_while(move |(key, _)| key.starts_with(prefix)),
            ),
            None => Box::new(documents.iter()),
        };
        Ok(candidates
            .filter(|(_, body)| filter.matches_body(body))
            .map(|(key, body)| Document {
                key: key.clone(),
                body: body.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put("devices/a", &json!({"platform": "iOS"}))
            .unwrap();
        store
            .put("devices/b", &json!({"platform": "Android"}))
            .unwrap();
        store
            .put("devicesx/c", &json!({"platform": "iOS"}))
            .unwrap();
        store.put("patients/p1", &json!({"id": "p1"})).unwrap();
        store
    }

    #[test]
    fn test_get_put_delete() {
        let store = seeded();
        assert_eq!(store.get("patients/p1").unwrap(), Some(json!({"id": "p1"})));
        assert!(store.delete("patients/p1").unwrap());
        assert!(!store.delete("patients/p1").unwrap());
        assert_eq!(store.get("patients/p1").unwrap(), None);
    }

    #[test]
    fn test_query_by_prefix_is_ordered() {
        let keys: Vec<String> = seeded()
            .query(&QueryFilter::all().with_prefix("devices/"))
            .unwrap()
            .into_iter()
            .map(|doc| doc.key)
            .collect();
        assert_eq!(keys, vec!["devices/a", "devices/b"]);
    }

    #[test]
    fn test_query_by_field() {
        let docs = seeded()
            .query(&QueryFilter::all().where_eq("platform", "iOS"))
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|doc| doc.body["platform"] == "iOS"));
    }

    #[test]
    fn test_within_collection_excludes_lookalike_prefix() {
        let docs = seeded()
            .query(&QueryFilter::all().where_eq("platform", "iOS").within("devices"))
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].key, "devices/a");
    }

    #[test]
    fn test_empty_filter_selects_everything() {
        assert_eq!(seeded().query(&QueryFilter::all()).unwrap().len(), 4);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.put("", &json!({})),
            Err(PersistenceError::InvalidKey(_))
        ));
        assert!(store.put(" padded", &json!({})).is_err());
        assert!(store.is_empty().unwrap());
    }
}
