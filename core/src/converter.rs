//! Decode-to-domain and encode-to-wire coupling for persisted types.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::{DecodeContext, DecodeOptions};
use crate::error::{DecodeError, EncodingError};
use crate::node::{Decoder, Encoder};

/// Couples the schema that builds a domain value `D` from raw input with the
/// projection that turns `D` back into raw output.
///
/// The decode side must produce a fully constructed `D`, so any invariant the
/// domain constructor enforces is part of decoding. Fields that hold no
/// value are left out of the encoded object.
///
/// # Examples
///
/// ```
/// use record_codec_core::*;
/// use serde_json::json;
///
/// #[derive(Debug, PartialEq)]
/// struct Tag {
///     label: String,
///     color: Option<String>,
/// }
///
/// struct TagSchema;
///
/// impl Decoder for TagSchema {
///     type Output = Tag;
///
///     fn decode_in(&self, raw: &serde_json::Value, cx: &mut DecodeContext) -> Result<Tag, DecodeError> {
///         let object = ObjectView::new(raw, cx)?;
///         let (label, color) = (
///             object.field(cx, "label", &non_empty_string()),
///             object.field(cx, "color", &optionalish(string())),
///         )
///             .collect_fields()?;
///         Ok(Tag { label, color })
///     }
///
///     fn expected(&self) -> String {
///         "Tag".to_string()
///     }
/// }
///
/// impl Encoder for TagSchema {
///     type Input = Tag;
///
///     fn encode(&self, tag: &Tag) -> Result<serde_json::Value, EncodingError> {
///         let mut out = ObjectWriter::new();
///         out.field("label", &non_empty_string(), &tag.label)?
///             .field("color", &optionalish(string()), &tag.color)?;
///         Ok(out.finish())
///     }
/// }
///
/// let tags = SchemaConverter::from_node(TagSchema);
/// let tag = tags.decode(&json!({"label": "urgent", "color": null})).unwrap();
/// assert_eq!(tag, Tag { label: "urgent".into(), color: None });
/// assert_eq!(tags.encode(&tag).unwrap(), json!({"label": "urgent"}));
/// ```
pub struct SchemaConverter<D> {
    schema: Arc<dyn Decoder<Output = D>>,
    encoder: Arc<dyn Encoder<Input = D>>,
}

impl<D: 'static> SchemaConverter<D> {
    /// Couples a decode-side schema with a separate encoder.
    pub fn new<S, E>(schema: S, encoder: E) -> Self
    where
        S: Decoder<Output = D> + 'static,
        E: Encoder<Input = D> + 'static,
    {
        Self {
            schema: Arc::new(schema),
            encoder: Arc::new(encoder),
        }
    }

    /// Uses one node for both halves.
    pub fn from_node<N>(node: N) -> Self
    where
        N: Decoder<Output = D> + Encoder<Input = D> + 'static,
    {
        let node = Arc::new(node);
        Self {
            schema: node.clone(),
            encoder: node,
        }
    }

    /// The decode-side schema.
    pub fn schema(&self) -> &dyn Decoder<Output = D> {
        self.schema.as_ref()
    }

    /// Decodes raw input into a domain value.
    pub fn decode(&self, raw: &Value) -> Result<D, DecodeError> {
        self.schema.decode(raw)
    }

    /// Decodes raw input with explicit options.
    pub fn decode_with(&self, raw: &Value, options: &DecodeOptions) -> Result<D, DecodeError> {
        self.schema.decode_with(raw, options)
    }

    /// Projects a domain value back to raw form.
    pub fn encode(&self, value: &D) -> Result<Value, EncodingError> {
        self.encoder.encode(value)
    }
}

impl<D> Clone for SchemaConverter<D> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            encoder: Arc::clone(&self.encoder),
        }
    }
}

impl<D> fmt::Debug for SchemaConverter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaConverter")
            .field("expects", &self.schema.expected())
            .finish()
    }
}

impl<D> Decoder for SchemaConverter<D> {
    type Output = D;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<D, DecodeError> {
        self.schema.decode_in(raw, cx)
    }

    fn decode_absent(&self, cx: &mut DecodeContext) -> Result<D, DecodeError> {
        self.schema.decode_absent(cx)
    }

    fn expected(&self) -> String {
        self.schema.expected()
    }
}

impl<D> Encoder for SchemaConverter<D> {
    type Input = D;

    fn encode(&self, value: &D) -> Result<Value, EncodingError> {
        self.encoder.encode(value)
    }

    fn encode_field(&self, value: &D) -> Result<Option<Value>, EncodingError> {
        self.encoder.encode_field(value)
    }
}
