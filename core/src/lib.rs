//! Bidirectional schema codecs over JSON-shaped values.
//!
//! This crate turns untyped structural input ([`serde_json::Value`]) into
//! validated domain values and back:
//!
//! - [`Decoder`] / [`Encoder`]: the two halves every schema node implements.
//!   Decoding reports every mismatch as a [`ValidationIssue`] carrying the
//!   full [`Path`] to the offending value.
//! - [`BidirectionalSchema`]: pairs a decode side with an encode side, either
//!   one node serving both ([`BidirectionalSchema::simple`]) or two distinct
//!   nodes ([`BidirectionalSchema::separate`]).
//! - [`SchemaConverter`]: a domain type's decode/encode pair, erased behind
//!   shared handles so it can be stored in a [`SchemaRegistry`].
//! - [`optionalish`] / [`optionalish_default`]: treat `null` and missing keys
//!   alike; encoding omits "no value" fields instead of writing `null`.
//! - [`recursive`]: self-referential schemas resolved through a thunk, with
//!   a depth guard ([`DecodeOptions::max_depth`]).
//! - [`DiscriminatedUnion`]: dispatch on a tag field, failing with
//!   [`UnknownDiscriminantError`] on unregistered tags.
//! - [`TaggedCollection`]: OR-filter lookups over repeated system/value
//!   collections.
//! - [`LazyValue`]: a memoized, retry-on-failure derived value.
//!
//! # Example
//!
//! ```
//! use record_codec_core::*;
//! use serde_json::json;
//!
//! #[derive(Debug, PartialEq)]
//! struct Device {
//!     token: String,
//!     language: Option<String>,
//! }
//!
//! struct DeviceSchema;
//!
//! impl Decoder for DeviceSchema {
//!     type Output = Device;
//!
//!     fn decode_in(&self, raw: &serde_json::Value, cx: &mut DecodeContext) -> Result<Device, DecodeError> {
//!         let object = ObjectView::new(raw, cx)?;
//!         let (token, language) = (
//!             object.field(cx, "token", &non_empty_string()),
//!             object.field(cx, "language", &optionalish(string())),
//!         )
//!             .collect_fields()?;
//!         Ok(Device { token, language })
//!     }
//!
//!     fn expected(&self) -> String {
//!         "device".to_string()
//!     }
//! }
//!
//! impl Encoder for DeviceSchema {
//!     type Input = Device;
//!
//!     fn encode(&self, device: &Device) -> Result<serde_json::Value, EncodingError> {
//!         let mut out = ObjectWriter::new();
//!         out.field("token", &non_empty_string(), &device.token)?
//!             .field("language", &optionalish(string()), &device.language)?;
//!         Ok(out.finish())
//!     }
//! }
//!
//! let devices = SchemaConverter::from_node(DeviceSchema);
//! let device = devices.decode(&json!({"token": "tok1", "language": null})).unwrap();
//! assert_eq!(device.language, None);
//! assert_eq!(devices.encode(&device).unwrap(), json!({"token": "tok1"}));
//!
//! let err = devices.decode(&json!({"token": 7})).unwrap_err();
//! assert_eq!(err.to_string(), "1 validation issue: token: expected non-empty string, received number");
//! ```

mod bidirectional;
mod context;
mod converter;
mod datetime;
mod error;
mod lazy;
mod lookup;
mod node;
mod object;
mod open;
mod optional;
mod primitives;
mod recursive;
mod registry;
mod union;
mod value;

pub use bidirectional::BidirectionalSchema;
pub use context::{DEFAULT_MAX_DEPTH, DecodeContext, DecodeOptions};
pub use converter::SchemaConverter;
pub use datetime::{DateTimeDecoder, DateTimeEncoder, DateTimeSchema, date_time};
pub use error::{
    CodecError, DecodeError, EncodingError, SchemaBuildError, UnknownDiscriminantError,
    ValidationError, ValidationIssue,
};
pub use lazy::LazyValue;
pub use lookup::{Filter, SystemTagged, TagFilter, TaggedCollection};
pub use node::{Decoder, Encoder, Mapped, SchemaNode, SharedNode, map, shared, try_map};
pub use object::{CollectFields, FieldLayers, FieldSet, ObjectView, ObjectWriter};
pub use open::{OpenRecord, OpenRecordNode, open_record};
pub use optional::{Optionalish, OptionalishDefault, optionalish, optionalish_default};
pub use primitives::{
    ArrayNode, BooleanNode, IntegerNode, LiteralNode, NumberNode, OneOfNode, StringMapNode,
    StringNode, array, boolean, integer, literal, non_empty_string, number, one_of, string,
    string_map,
};
pub use recursive::{Recursive, recursive};
pub use registry::{RegistryBuilder, SchemaRegistry};
pub use union::{
    Discriminated, DiscriminatedCollection, DiscriminatedUnion, UnionBuilder,
    discriminated_collection,
};
pub use value::{ABSENT, Path, PathSegment, shape_of};
