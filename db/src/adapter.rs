//! Typed access to one collection of a [`DocumentStore`].

use std::fmt;

use record_codec_core::{DecodeOptions, SchemaConverter};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{PersistenceError, Result};
use crate::store::{DocumentStore, QueryFilter, validate_key};

/// Decodes on read and encodes on write around a store.
///
/// Documents live under `{collection}/{id}`. A document that fails to
/// decode, or a value that fails to encode, is logged with its key and
/// payload and the error is returned; nothing is retried or skipped.
///
/// # Examples
///
/// ```
/// use record_codec_core::{SchemaConverter, integer};
/// use record_codec_db::{MemoryStore, TypedCollection};
///
/// let counters = TypedCollection::new(
///     MemoryStore::new(),
///     "counters",
///     SchemaConverter::from_node(integer()),
/// );
/// counters.put("visits", &3).unwrap();
/// assert_eq!(counters.get("visits").unwrap(), Some(3));
/// ```
pub struct TypedCollection<S, D> {
    store: S,
    collection: String,
    converter: SchemaConverter<D>,
    options: DecodeOptions,
}

impl<S, D> TypedCollection<S, D>
where
    S: DocumentStore,
    D: fmt::Debug + 'static,
{
    pub fn new(store: S, collection: impl Into<String>, converter: SchemaConverter<D>) -> Self {
        Self {
            store,
            collection: collection.into(),
            converter,
            options: DecodeOptions::default(),
        }
    }

    /// Uses `options` for every decode.
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full store key of `id`.
    pub fn key(&self, id: &str) -> String {
        format!("{}/{}", self.collection, id)
    }

    pub fn get(&self, id: &str) -> Result<Option<D>> {
        let key = self.key(id);
        match self.store.get(&key)? {
            Some(body) => self.decode(&key, &body).map(Some),
            None => Ok(None),
        }
    }

    pub fn put(&self, id: &str, value: &D) -> Result<()> {
        validate_key(id)?;
        let key = self.key(id);
        let body = self.converter.encode(value).map_err(|source| {
            error!(key = %key, payload = ?value, error = %source, "document failed to encode");
            PersistenceError::Encode {
                key: key.clone(),
                source,
            }
        })?;
        debug!(key = %key, "writing document");
        self.store.put(&key, &body)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let key = self.key(id);
        debug!(key = %key, "deleting document");
        self.store.delete(&key)
    }

    /// Decoded documents selected by `filter`, keyed by id.
    ///
    /// The filter's prefix, if any, is relative to the collection. The first
    /// document that fails to decode fails the whole query.
    pub fn query(&self, filter: QueryFilter) -> Result<Vec<(String, D)>> {
        let filter = filter.within(&self.collection);
        let documents = self.store.query(&filter)?;
        debug!(collection = %self.collection, matched = documents.len(), "query");
        let root = self.collection.len() + 1;
        documents
            .into_iter()
            .map(|document| {
                let value = self.decode(&document.key, &document.body)?;
                Ok((document.key[root..].to_string(), value))
            })
            .collect()
    }

    /// Every document in the collection.
    pub fn all(&self) -> Result<Vec<(String, D)>> {
        self.query(QueryFilter::all())
    }

    fn decode(&self, key: &str, body: &Value) -> Result<D> {
        self.converter
            .decode_with(body, &self.options)
            .map_err(|source| {
                error!(key, payload = %body, error = %source, "stored document failed to decode");
                PersistenceError::Decode {
                    key: key.to_string(),
                    source,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use record_codec_core::{DecodeError, Decoder, EncodingError, integer, number};
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn counters(store: &MemoryStore) -> TypedCollection<&MemoryStore, i64> {
        TypedCollection::new(store, "counters", SchemaConverter::from_node(integer()))
    }

    #[test]
    fn test_put_writes_under_collection_key() {
        let store = MemoryStore::new();
        counters(&store).put("a", &5).unwrap();
        assert_eq!(store.get("counters/a").unwrap(), Some(json!(5)));
    }

    #[test]
    fn test_bad_document_surfaces_decode_error_with_key() {
        let store = MemoryStore::new();
        store.put("counters/bad", &json!("five")).unwrap();
        let err = counters(&store).get("bad").unwrap_err();
        let PersistenceError::Decode { key, source } = &err else {
            panic!("expected a decode failure");
        };
        assert_eq!(key, "counters/bad");
        assert_eq!(source.issues()[0].expected, integer().expected());
        assert!(matches!(err.decode_error(), Some(DecodeError::Invalid(_))));
    }

    #[test]
    fn test_unencodable_value_surfaces_encode_error_and_writes_nothing() {
        let store = MemoryStore::new();
        let readings = TypedCollection::new(&store, "readings", SchemaConverter::from_node(number()));
        let err = readings.put("x", &f64::NAN).unwrap_err();
        assert!(matches!(
            &err,
            PersistenceError::Encode { key, source: EncodingError::NonFiniteNumber }
                if key == "readings/x"
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_query_strips_collection_prefix() {
        let store = MemoryStore::new();
        let collection = counters(&store);
        collection.put("b", &2).unwrap();
        collection.put("a", &1).unwrap();
        store.put("other/c", &json!(3)).unwrap();
        assert_eq!(
            collection.all().unwrap(),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[test]
    fn test_query_fails_on_first_bad_document() {
        let store = MemoryStore::new();
        let collection = counters(&store);
        collection.put("a", &1).unwrap();
        store.put("counters/b", &json!(null)).unwrap();
        assert!(collection.all().is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            counters(&store).put("", &1),
            Err(PersistenceError::InvalidKey(_))
        ));
    }
}
