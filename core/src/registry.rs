//! Process-wide lookup of converters by type name.
//!
//! Schemas are registered leaves first; composite schemas fetch the
//! converters they embed from the builder, so every reference is to an
//! already-built graph. [`RegistryBuilder::build`] freezes the result.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::context::DecodeOptions;
use crate::converter::SchemaConverter;
use crate::error::{CodecError, SchemaBuildError};

trait ErasedCodec: Send + Sync {
    fn normalize(&self, raw: &Value, options: &DecodeOptions) -> Result<Value, CodecError>;
    fn validate(&self, raw: &Value, options: &DecodeOptions) -> Result<(), CodecError>;
    fn as_any(&self) -> &dyn Any;
}

impl<D: 'static> ErasedCodec for SchemaConverter<D> {
    fn normalize(&self, raw: &Value, options: &DecodeOptions) -> Result<Value, CodecError> {
        let value = self.decode_with(raw, options)?;
        Ok(self.encode(&value)?)
    }

    fn validate(&self, raw: &Value, options: &DecodeOptions) -> Result<(), CodecError> {
        self.decode_with(raw, options)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type Entries = BTreeMap<String, Arc<dyn ErasedCodec>>;

fn typed<'a, D: 'static>(entries: &'a Entries, name: &str) -> Option<&'a SchemaConverter<D>> {
    entries.get(name)?.as_any().downcast_ref::<SchemaConverter<D>>()
}

/// Collects converters in dependency order.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Entries,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `converter` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaBuildError::DuplicateType`] if `name` is taken.
    pub fn register<D: 'static>(
        &mut self,
        name: &str,
        converter: SchemaConverter<D>,
    ) -> Result<&mut Self, SchemaBuildError> {
        if self.entries.contains_key(name) {
            return Err(SchemaBuildError::DuplicateType(name.to_string()));
        }
        self.entries.insert(name.to_string(), Arc::new(converter));
        Ok(self)
    }

    /// An already-registered converter, for embedding in a composite.
    ///
    /// Returns `None` if `name` is unknown or was registered for another
    /// domain type.
    pub fn get<D: 'static>(&self, name: &str) -> Option<SchemaConverter<D>> {
        typed(&self.entries, name).cloned()
    }

    /// Like [`get`](Self::get), but a missing entry is a build error.
    pub fn require<D: 'static>(&self, name: &str) -> Result<SchemaConverter<D>, SchemaBuildError> {
        self.get(name)
            .ok_or_else(|| SchemaBuildError::MissingType(name.to_string()))
    }

    /// Freezes the builder.
    pub fn build(self) -> SchemaRegistry {
        debug!(types = self.entries.len(), "schema registry built");
        SchemaRegistry {
            entries: self.entries,
        }
    }
}

/// Immutable map from type name to converter.
pub struct SchemaRegistry {
    entries: Entries,
}

impl SchemaRegistry {
    /// Typed lookup.
    pub fn get<D: 'static>(&self, name: &str) -> Option<&SchemaConverter<D>> {
        typed(&self.entries, name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes `raw` as `name` and encodes it back.
    ///
    /// The output is the canonical wire form: unknown keys stripped, absent
    /// optionals omitted, defaults filled in.
    pub fn normalize(&self, name: &str, raw: &Value) -> Result<Value, CodecError> {
        self.normalize_with(name, raw, &DecodeOptions::default())
    }

    /// [`normalize`](Self::normalize) with explicit decode options.
    pub fn normalize_with(
        &self,
        name: &str,
        raw: &Value,
        options: &DecodeOptions,
    ) -> Result<Value, CodecError> {
        self.entry(name)?.normalize(raw, options)
    }

    /// Decodes `raw` as `name`, discarding the value.
    pub fn validate(&self, name: &str, raw: &Value, options: &DecodeOptions) -> Result<(), CodecError> {
        self.entry(name)?.validate(raw, options)
    }

    fn entry(&self, name: &str) -> Result<&dyn ErasedCodec, CodecError> {
        self.entries
            .get(name)
            .map(|entry| entry.as_ref())
            .ok_or_else(|| CodecError::UnknownType(name.to_string()))
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::DecodeError;
    use crate::primitives::{integer, string};

    fn registry() -> SchemaRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .register("Count", SchemaConverter::from_node(integer()))
            .unwrap()
            .register("Label", SchemaConverter::from_node(string()))
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_typed_lookup_checks_domain_type() {
        let registry = registry();
        assert!(registry.get::<i64>("Count").is_some());
        assert!(registry.get::<String>("Count").is_none());
        assert!(registry.get::<i64>("Missing").is_none());
    }

    #[test]
    fn test_builder_lends_registered_leaves() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("Count", SchemaConverter::from_node(integer()))
            .unwrap();
        let count = builder.get::<i64>("Count").unwrap();
        assert_eq!(count.decode(&json!(4)).unwrap(), 4);
        assert_eq!(
            builder.require::<String>("Count").err(),
            Some(SchemaBuildError::MissingType("Count".to_string()))
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("Count", SchemaConverter::from_node(integer()))
            .unwrap();
        let err = builder
            .register("Count", SchemaConverter::from_node(string()))
            .err();
        assert_eq!(err, Some(SchemaBuildError::DuplicateType("Count".to_string())));
    }

    #[test]
    fn test_normalize_and_unknown_type() {
        let registry = registry();
        assert_eq!(registry.normalize("Count", &json!(3.0)).unwrap(), json!(3));
        assert!(matches!(
            registry.normalize("Label", &json!(3)),
            Err(CodecError::Decode(DecodeError::Invalid(_)))
        ));
        assert_eq!(
            registry.normalize("Nope", &json!(1)),
            Err(CodecError::UnknownType("Nope".to_string()))
        );
    }

    #[test]
    fn test_type_names_sorted() {
        let registry = registry();
        let names: Vec<_> = registry.type_names().collect();
        assert_eq!(names, vec!["Count", "Label"]);
    }
}
