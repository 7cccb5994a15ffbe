//! Record decoding and encoding helpers.
//!
//! Record schemas read fields through an [`ObjectView`], gather the per-field
//! results with [`CollectFields`] so that every bad field is reported in one
//! pass, and write back through an [`ObjectWriter`] that leaves out fields
//! without a value.
//!
//! Shared field groups (the fields every resource carries, say) are
//! [`FieldSet`]s. [`FieldLayers`] stacks them in order and refuses a layer
//! that would redefine a key claimed further down.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::context::DecodeContext;
use crate::error::{DecodeError, EncodingError, SchemaBuildError, ValidationError};
use crate::node::{Decoder, Encoder};

/// Read access to an object being decoded.
#[derive(Debug, Clone, Copy)]
pub struct ObjectView<'a> {
    entries: &'a Map<String, Value>,
}

impl<'a> ObjectView<'a> {
    /// Views `raw` as an object, or reports what it was instead.
    pub fn new(raw: &'a Value, cx: &DecodeContext) -> Result<Self, DecodeError> {
        match raw {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(cx.mismatch("object", other)),
        }
    }

    /// Decodes `key` with `node`, using the node's absent handling when the
    /// key is missing.
    pub fn field<N>(&self, cx: &mut DecodeContext, key: &str, node: &N) -> Result<N::Output, DecodeError>
    where
        N: Decoder + ?Sized,
    {
        cx.at_key(key, |cx| match self.entries.get(key) {
            Some(raw) => node.decode_in(raw, cx),
            None => node.decode_absent(cx),
        })
    }

    /// Raw value under `key`.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries.get(key)
    }

    /// The underlying map.
    pub fn entries(&self) -> &'a Map<String, Value> {
        self.entries
    }
}

/// Combines independently decoded fields into one result.
///
/// Validation issues from all fields are merged in tuple order. A fatal
/// error (unknown discriminant, depth guard) is returned as is.
pub trait CollectFields {
    /// Tuple of the successfully decoded values.
    type Output;

    /// Returns every value, or every issue.
    fn collect_fields(self) -> Result<Self::Output, DecodeError>;
}

macro_rules! impl_collect_fields {
    ($($name:ident),+) => {
        impl<$($name),+> CollectFields for ($(Result<$name, DecodeError>,)+) {
            type Output = ($($name,)+);

            #[allow(non_snake_case)]
            fn collect_fields(self) -> Result<Self::Output, DecodeError> {
                let ($($name,)+) = self;
                let mut issues = ValidationError::default();
                $(
                    let $name = match $name {
                        Ok(value) => Some(value),
                        Err(DecodeError::Invalid(err)) => {
                            issues.absorb(err);
                            None
                        }
                        Err(fatal) => return Err(fatal),
                    };
                )+
                match ($($name,)+) {
                    ($(Some($name),)+) if issues.is_empty() => Ok(($($name,)+)),
                    _ => Err(DecodeError::Invalid(issues)),
                }
            }
        }
    };
}

impl_collect_fields!(A);
impl_collect_fields!(A, B);
impl_collect_fields!(A, B, C);
impl_collect_fields!(A, B, C, D);
impl_collect_fields!(A, B, C, D, E);
impl_collect_fields!(A, B, C, D, E, F);
impl_collect_fields!(A, B, C, D, E, F, G);
impl_collect_fields!(A, B, C, D, E, F, G, H);
impl_collect_fields!(A, B, C, D, E, F, G, H, I);
impl_collect_fields!(A, B, C, D, E, F, G, H, I, J);
impl_collect_fields!(A, B, C, D, E, F, G, H, I, J, K);
impl_collect_fields!(A, B, C, D, E, F, G, H, I, J, K, L);

/// Builds an encoded object field by field.
#[derive(Debug, Default)]
pub struct ObjectWriter {
    entries: Map<String, Value>,
}

impl ObjectWriter {
    /// Starts an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `value` under `key`, omitting it when the node reports no value.
    pub fn field<N>(&mut self, key: &str, node: &N, value: &N::Input) -> Result<&mut Self, EncodingError>
    where
        N: Encoder + ?Sized,
    {
        if let Some(encoded) = node.encode_field(value)? {
            self.entries.insert(key.to_string(), encoded);
        }
        Ok(self)
    }

    /// Inserts an already encoded value.
    pub fn insert(&mut self, key: &str, value: Value) -> &mut Self {
        self.entries.insert(key.to_string(), value);
        self
    }

    /// Finishes the object.
    pub fn finish(self) -> Value {
        Value::Object(self.entries)
    }
}

/// A reusable group of record fields.
pub trait FieldSet: Send + Sync {
    /// Values read from the group's keys.
    type Fields;

    /// Keys this group owns.
    fn keys(&self) -> &[&'static str];

    /// Reads the group from an object.
    fn read(&self, object: &ObjectView<'_>, cx: &mut DecodeContext) -> Result<Self::Fields, DecodeError>;

    /// Writes the group into an object.
    fn write(&self, fields: &Self::Fields, out: &mut ObjectWriter) -> Result<(), EncodingError>;
}

/// Ordered, append-only record of which layer claimed which key.
///
/// # Examples
///
/// ```
/// use record_codec_core::{FieldLayers, SchemaBuildError};
///
/// let layers = FieldLayers::new()
///     .with_keys(&["id", "meta"])
///     .and_then(|l| l.with_keys(&["status", "code"]))
///     .unwrap();
/// assert_eq!(layers.keys(), &["id", "meta", "status", "code"]);
///
/// let clash = layers.with_keys(&["id"]);
/// assert_eq!(clash.unwrap_err(), SchemaBuildError::DuplicateField("id".into()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldLayers {
    keys: Vec<&'static str>,
}

impl FieldLayers {
    /// No layers yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the keys of `set` as the next layer.
    pub fn with<S: FieldSet + ?Sized>(self, set: &S) -> Result<Self, SchemaBuildError> {
        self.with_keys(set.keys())
    }

    /// Appends `keys` as the next layer.
    pub fn with_keys(mut self, keys: &[&'static str]) -> Result<Self, SchemaBuildError> {
        let claimed: HashSet<&str> = self.keys.iter().copied().collect();
        let mut layer = HashSet::new();
        for key in keys {
            if claimed.contains(key) || !layer.insert(*key) {
                return Err(SchemaBuildError::DuplicateField((*key).to_string()));
            }
        }
        self.keys.extend_from_slice(keys);
        Ok(self)
    }

    /// Every claimed key, lowest layer first.
    pub fn keys(&self) -> &[&'static str] {
        &self.keys
    }

    /// Returns `true` if some layer claims `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|claimed| *claimed == key)
    }
}
