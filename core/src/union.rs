//! Discriminated unions: dispatch on a named tag field.
//!
//! Each resource family names its own tag field (`resourceType`, `kind`,
//! `type`) and its own set of legal values, so both are supplied per union.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::DecodeContext;
use crate::error::{DecodeError, EncodingError, SchemaBuildError, UnknownDiscriminantError};
use crate::node::{Decoder, Encoder};
use crate::object::ObjectView;
use crate::primitives::ArrayNode;

/// A value that reports which union branch it belongs to.
pub trait Discriminated {
    /// The discriminant value for this value's branch.
    fn discriminant(&self) -> &str;
}

trait Branch<T>: Send + Sync {
    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<T, DecodeError>;
    fn encode(&self, tag: &str, value: &T) -> Result<Value, EncodingError>;
}

struct Variant<N, W, U> {
    node: N,
    wrap: W,
    unwrap: U,
}

impl<T, N, W, U> Branch<T> for Variant<N, W, U>
where
    N: Decoder + Encoder<Input = <N as Decoder>::Output>,
    W: Fn(<N as Decoder>::Output) -> T + Send + Sync,
    U: Fn(&T) -> Option<&<N as Decoder>::Output> + Send + Sync,
{
    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<T, DecodeError> {
        self.node.decode_in(raw, cx).map(&self.wrap)
    }

    fn encode(&self, tag: &str, value: &T) -> Result<Value, EncodingError> {
        let inner = (self.unwrap)(value).ok_or_else(|| EncodingError::VariantMismatch {
            tag: tag.to_string(),
        })?;
        self.node.encode(inner)
    }
}

struct Direct<N>(N);

impl<T, N> Branch<T> for Direct<N>
where
    N: Decoder<Output = T> + Encoder<Input = T>,
{
    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<T, DecodeError> {
        self.0.decode_in(raw, cx)
    }

    fn encode(&self, _tag: &str, value: &T) -> Result<Value, EncodingError> {
        self.0.encode(value)
    }
}

/// Dispatches objects to a branch schema chosen by a discriminant field.
///
/// An item whose discriminant is missing or unregistered fails with
/// [`UnknownDiscriminantError`]; there is no fallback branch. Encoding
/// dispatches on the value's own [`Discriminated::discriminant`] and writes
/// the tag into the output if the branch encoder left it out.
///
/// # Examples
///
/// ```
/// use record_codec_core::*;
/// use serde_json::json;
///
/// #[derive(Debug, PartialEq)]
/// enum Shape {
///     Circle(f64),
///     Square(f64),
/// }
///
/// impl Discriminated for Shape {
///     fn discriminant(&self) -> &str {
///         match self {
///             Shape::Circle(_) => "circle",
///             Shape::Square(_) => "square",
///         }
///     }
/// }
///
/// struct Measured(&'static str);
///
/// impl Decoder for Measured {
///     type Output = f64;
///     fn decode_in(&self, raw: &serde_json::Value, cx: &mut DecodeContext) -> Result<f64, DecodeError> {
///         ObjectView::new(raw, cx)?.field(cx, self.0, &number())
///     }
///     fn expected(&self) -> String {
///         "object".into()
///     }
/// }
///
/// impl Encoder for Measured {
///     type Input = f64;
///     fn encode(&self, size: &f64) -> Result<serde_json::Value, EncodingError> {
///         let mut out = ObjectWriter::new();
///         out.field(self.0, &number(), size)?;
///         Ok(out.finish())
///     }
/// }
///
/// let shapes = DiscriminatedUnion::builder("kind")
///     .variant("circle", Measured("radius"), Shape::Circle, |s| match s {
///         Shape::Circle(r) => Some(r),
///         _ => None,
///     })
///     .variant("square", Measured("side"), Shape::Square, |s| match s {
///         Shape::Square(side) => Some(side),
///         _ => None,
///     })
///     .build()
///     .unwrap();
///
/// let shape = shapes.decode(&json!({"kind": "square", "side": 2.0})).unwrap();
/// assert_eq!(shape, Shape::Square(2.0));
/// assert_eq!(shapes.encode(&shape).unwrap(), json!({"kind": "square", "side": 2.0}));
///
/// let err = shapes.decode(&json!({"kind": "hexagon"})).unwrap_err();
/// assert!(matches!(err, DecodeError::UnknownDiscriminant(_)));
/// ```
pub struct DiscriminatedUnion<T> {
    field: String,
    branches: Vec<(String, Arc<dyn Branch<T>>)>,
    index: HashMap<String, usize>,
}

/// Collects branches for a [`DiscriminatedUnion`].
pub struct UnionBuilder<T> {
    field: String,
    branches: Vec<(String, Arc<dyn Branch<T>>)>,
    index: HashMap<String, usize>,
    error: Option<SchemaBuildError>,
}

impl<T: 'static> UnionBuilder<T> {
    /// Registers a branch whose node produces a payload wrapped into `T`.
    ///
    /// `unwrap` selects the payload back out of a `T` for encoding.
    pub fn variant<N, W, U>(self, tag: &str, node: N, wrap: W, unwrap: U) -> Self
    where
        N: Decoder + Encoder<Input = <N as Decoder>::Output> + 'static,
        W: Fn(<N as Decoder>::Output) -> T + Send + Sync + 'static,
        U: Fn(&T) -> Option<&<N as Decoder>::Output> + Send + Sync + 'static,
    {
        self.push(tag, Arc::new(Variant { node, wrap, unwrap }))
    }

    /// Registers a branch whose node already produces `T`.
    pub fn branch<N>(self, tag: &str, node: N) -> Self
    where
        N: Decoder<Output = T> + Encoder<Input = T> + 'static,
    {
        self.push(tag, Arc::new(Direct(node)))
    }

    fn push(mut self, tag: &str, branch: Arc<dyn Branch<T>>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.index.contains_key(tag) {
            self.error = Some(SchemaBuildError::DuplicateDiscriminant {
                field: self.field.clone(),
                value: tag.to_string(),
            });
            return self;
        }
        self.index.insert(tag.to_string(), self.branches.len());
        self.branches.push((tag.to_string(), branch));
        self
    }

    /// Finishes the union.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaBuildError::DuplicateDiscriminant`] if a tag was
    /// registered twice, or [`SchemaBuildError::EmptyUnion`] if no branch
    /// was registered.
    pub fn build(self) -> Result<DiscriminatedUnion<T>, SchemaBuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.branches.is_empty() {
            return Err(SchemaBuildError::EmptyUnion(self.field));
        }
        Ok(DiscriminatedUnion {
            field: self.field,
            branches: self.branches,
            index: self.index,
        })
    }
}

impl<T> DiscriminatedUnion<T> {
    /// Starts a union over the discriminant field `field`.
    pub fn builder(field: &str) -> UnionBuilder<T> {
        UnionBuilder {
            field: field.to_string(),
            branches: Vec::new(),
            index: HashMap::new(),
            error: None,
        }
    }

    /// Name of the discriminant field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Registered discriminant values, in registration order.
    pub fn known_values(&self) -> Vec<&str> {
        self.branches.iter().map(|(tag, _)| tag.as_str()).collect()
    }

    /// Returns `true` if `tag` has a branch.
    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(tag)
    }

    fn unknown(&self, cx: &DecodeContext, value: Option<&Value>) -> DecodeError {
        UnknownDiscriminantError {
            path: cx.path(),
            field: self.field.clone(),
            value: value.map(|v| match v {
                Value::String(tag) => tag.clone(),
                other => other.to_string(),
            }),
            known: self.branches.iter().map(|(tag, _)| tag.clone()).collect(),
        }
        .into()
    }
}

impl<T> Clone for DiscriminatedUnion<T> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            branches: self.branches.clone(),
            index: self.index.clone(),
        }
    }
}

impl<T> Decoder for DiscriminatedUnion<T> {
    type Output = T;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<T, DecodeError> {
        let object = ObjectView::new(raw, cx)?;
        let tag = object.get(&self.field);
        let branch = tag
            .and_then(Value::as_str)
            .and_then(|tag| self.index.get(tag))
            .map(|&position| &self.branches[position].1);
        match branch {
            Some(branch) => branch.decode_in(raw, cx),
            None => Err(self.unknown(cx, tag)),
        }
    }

    fn expected(&self) -> String {
        format!("object tagged by `{}`", self.field)
    }
}

impl<T: Discriminated> Encoder for DiscriminatedUnion<T> {
    type Input = T;

    fn encode(&self, value: &T) -> Result<Value, EncodingError> {
        let tag = value.discriminant();
        let position = self
            .index
            .get(tag)
            .ok_or_else(|| EncodingError::UnregisteredVariant {
                field: self.field.clone(),
                tag: tag.to_string(),
            })?;
        let mut encoded = self.branches[*position].1.encode(tag, value)?;
        match &mut encoded {
            Value::Object(entries) => {
                entries
                    .entry(self.field.clone())
                    .or_insert_with(|| Value::String(tag.to_string()));
            }
            _ => {
                return Err(EncodingError::Invariant(format!(
                    "branch \"{tag}\" did not encode an object"
                )));
            }
        }
        Ok(encoded)
    }
}

/// Ordered sequence of heterogeneous items that share one discriminant field.
pub type DiscriminatedCollection<T> = ArrayNode<DiscriminatedUnion<T>>;

/// Wraps `union` as an array node; issues are reported under each item's index.
pub fn discriminated_collection<T>(union: DiscriminatedUnion<T>) -> DiscriminatedCollection<T> {
    crate::primitives::array(union)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ValidationIssue;
    use crate::object::{CollectFields, ObjectWriter};
    use crate::primitives::{integer, literal, string};
    use crate::value::Path;

    #[derive(Debug, PartialEq)]
    enum Event {
        Login { user: String },
        Steps { count: i64 },
    }

    impl Discriminated for Event {
        fn discriminant(&self) -> &str {
            match self {
                Event::Login { .. } => "login",
                Event::Steps { .. } => "steps",
            }
        }
    }

    struct LoginSchema;

    impl Decoder for LoginSchema {
        type Output = Event;

        fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Event, DecodeError> {
            let object = ObjectView::new(raw, cx)?;
            let ((), user) = (
                object.field(cx, "type", &literal("login")),
                object.field(cx, "user", &string()),
            )
                .collect_fields()?;
            Ok(Event::Login { user })
        }

        fn expected(&self) -> String {
            "login event".to_string()
        }
    }

    impl Encoder for LoginSchema {
        type Input = Event;

        fn encode(&self, event: &Event) -> Result<Value, EncodingError> {
            let Event::Login { user } = event else {
                return Err(EncodingError::VariantMismatch {
                    tag: event.discriminant().to_string(),
                });
            };
            let mut out = ObjectWriter::new();
            out.field("type", &literal("login"), &())?
                .field("user", &string(), user)?;
            Ok(out.finish())
        }
    }

    struct StepsSchema;

    impl Decoder for StepsSchema {
        type Output = i64;

        fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<i64, DecodeError> {
            ObjectView::new(raw, cx)?.field(cx, "count", &integer())
        }

        fn expected(&self) -> String {
            "steps event".to_string()
        }
    }

    impl Encoder for StepsSchema {
        type Input = i64;

        fn encode(&self, count: &i64) -> Result<Value, EncodingError> {
            let mut out = ObjectWriter::new();
            out.field("count", &integer(), count)?;
            Ok(out.finish())
        }
    }

    fn events() -> DiscriminatedUnion<Event> {
        DiscriminatedUnion::builder("type")
            .branch("login", LoginSchema)
            .variant(
                "steps",
                StepsSchema,
                |count| Event::Steps { count },
                |event| match event {
                    Event::Steps { count } => Some(count),
                    _ => None,
                },
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_registered_tag_matches_branch_decode() {
        let raw = json!({"type": "login", "user": "ada"});
        assert_eq!(events().decode(&raw).unwrap(), LoginSchema.decode(&raw).unwrap());
    }

    #[test]
    fn test_unknown_tag_names_value_and_known_set() {
        let err = events().decode(&json!({"type": "logout"})).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownDiscriminant(UnknownDiscriminantError {
                path: Path::root(),
                field: "type".to_string(),
                value: Some("logout".to_string()),
                known: vec!["login".to_string(), "steps".to_string()],
            })
        );
    }

    #[test]
    fn test_missing_tag_is_unknown_not_first_branch() {
        let err = events().decode(&json!({"user": "ada"})).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnknownDiscriminant(UnknownDiscriminantError { value: None, .. })
        ));
    }

    #[test]
    fn test_non_string_tag_is_rendered_as_json_text() {
        let err = events().decode(&json!({"type": 3})).unwrap_err();
        let DecodeError::UnknownDiscriminant(err) = err else {
            panic!("expected unknown discriminant");
        };
        assert_eq!(err.value.as_deref(), Some("3"));
    }

    #[test]
    fn test_collection_prefixes_item_position() {
        let collection = discriminated_collection(events());
        let err = collection
            .decode(&json!([{"type": "steps", "count": 10}, {"type": "steps", "count": "many"}]))
            .unwrap_err();
        assert_eq!(
            err.issues(),
            &[ValidationIssue::new(Path::root().join(1usize).join("count"), "integer", "string")]
        );
    }

    #[test]
    fn test_collection_unknown_tag_is_fatal_with_position() {
        let collection = discriminated_collection(events());
        let err = collection
            .decode(&json!([{"type": "steps", "count": "x"}, {"type": "sleep"}]))
            .unwrap_err();
        let DecodeError::UnknownDiscriminant(err) = err else {
            panic!("expected unknown discriminant");
        };
        assert_eq!(err.path.to_string(), "[1]");
    }

    #[test]
    fn test_encode_dispatches_on_runtime_tag_and_writes_tag() {
        let union = events();
        assert_eq!(
            union.encode(&Event::Steps { count: 4 }).unwrap(),
            json!({"type": "steps", "count": 4})
        );
        assert_eq!(
            union.encode(&Event::Login { user: "ada".into() }).unwrap(),
            json!({"type": "login", "user": "ada"})
        );
    }

    #[test]
    fn test_unregistered_runtime_tag_fails_encode() {
        let only_login = DiscriminatedUnion::builder("type")
            .branch("login", LoginSchema)
            .build()
            .unwrap();
        assert_eq!(
            only_login.encode(&Event::Steps { count: 1 }),
            Err(EncodingError::UnregisteredVariant {
                field: "type".to_string(),
                tag: "steps".to_string()
            })
        );
    }

    #[test]
    fn test_builder_rejects_duplicate_and_empty() {
        let duplicate = DiscriminatedUnion::<Event>::builder("type")
            .branch("login", LoginSchema)
            .branch("login", LoginSchema)
            .build();
        assert!(matches!(
            duplicate,
            Err(SchemaBuildError::DuplicateDiscriminant { .. })
        ));
        assert_eq!(
            DiscriminatedUnion::<Event>::builder("type").build().err(),
            Some(SchemaBuildError::EmptyUnion("type".to_string()))
        );
    }
}
