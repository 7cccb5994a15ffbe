//! Leaf and container nodes: strings, numbers, booleans, literals,
//! string enumerations, arrays, and string-keyed maps.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::context::DecodeContext;
use crate::error::{DecodeError, EncodingError, ValidationError};
use crate::node::{Decoder, Encoder};
use crate::value::shape_of;

/// Accepts any JSON string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringNode {
    non_empty: bool,
}

/// A string node.
pub fn string() -> StringNode {
    StringNode { non_empty: false }
}

/// A string node that rejects `""`.
pub fn non_empty_string() -> StringNode {
    StringNode { non_empty: true }
}

impl Decoder for StringNode {
    type Output = String;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<String, DecodeError> {
        match raw {
            Value::String(text) if self.non_empty && text.is_empty() => {
                Err(cx.issue(self.expected(), "empty string"))
            }
            Value::String(text) => Ok(text.clone()),
            other => Err(cx.mismatch(self.expected(), other)),
        }
    }

    fn expected(&self) -> String {
        if self.non_empty {
            "non-empty string".to_string()
        } else {
            "string".to_string()
        }
    }
}

impl Encoder for StringNode {
    type Input = String;

    fn encode(&self, value: &String) -> Result<Value, EncodingError> {
        if self.non_empty && value.is_empty() {
            return Err(EncodingError::Invariant(
                "empty string in a non-empty field".to_string(),
            ));
        }
        Ok(Value::String(value.clone()))
    }
}

/// Accepts any finite JSON number as `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberNode;

/// A number node.
pub fn number() -> NumberNode {
    NumberNode
}

impl Decoder for NumberNode {
    type Output = f64;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<f64, DecodeError> {
        match raw.as_f64() {
            Some(value) => Ok(value),
            None => Err(cx.mismatch(self.expected(), raw)),
        }
    }

    fn expected(&self) -> String {
        "number".to_string()
    }
}

impl Encoder for NumberNode {
    type Input = f64;

    fn encode(&self, value: &f64) -> Result<Value, EncodingError> {
        Number::from_f64(*value)
            .map(Value::Number)
            .ok_or(EncodingError::NonFiniteNumber)
    }
}

/// Accepts JSON numbers without a fractional part as `i64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerNode;

/// An integer node.
pub fn integer() -> IntegerNode {
    IntegerNode
}

// Largest magnitude at which every f64 integer is exact.
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

impl Decoder for IntegerNode {
    type Output = i64;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<i64, DecodeError> {
        let Value::Number(number) = raw else {
            return Err(cx.mismatch(self.expected(), raw));
        };
        if let Some(value) = number.as_i64() {
            return Ok(value);
        }
        match number.as_f64() {
            Some(value) if value.fract() == 0.0 && value.abs() <= MAX_EXACT_F64 => Ok(value as i64),
            _ => Err(cx.issue(self.expected(), "number")),
        }
    }

    fn expected(&self) -> String {
        "integer".to_string()
    }
}

impl Encoder for IntegerNode {
    type Input = i64;

    fn encode(&self, value: &i64) -> Result<Value, EncodingError> {
        Ok(Value::from(*value))
    }
}

/// Accepts `true` and `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanNode;

/// A boolean node.
pub fn boolean() -> BooleanNode {
    BooleanNode
}

impl Decoder for BooleanNode {
    type Output = bool;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<bool, DecodeError> {
        match raw {
            Value::Bool(flag) => Ok(*flag),
            other => Err(cx.mismatch(self.expected(), other)),
        }
    }

    fn expected(&self) -> String {
        "boolean".to_string()
    }
}

impl Encoder for BooleanNode {
    type Input = bool;

    fn encode(&self, value: &bool) -> Result<Value, EncodingError> {
        Ok(Value::Bool(*value))
    }
}

/// Accepts exactly one string value and carries no data.
#[derive(Debug, Clone)]
pub struct LiteralNode {
    text: String,
}

/// A node matching the string `text` exactly.
pub fn literal(text: impl Into<String>) -> LiteralNode {
    LiteralNode { text: text.into() }
}

impl LiteralNode {
    /// The accepted string.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Decoder for LiteralNode {
    type Output = ();

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<(), DecodeError> {
        match raw {
            Value::String(text) if *text == self.text => Ok(()),
            Value::String(text) => Err(cx.issue(self.expected(), format!("\"{text}\""))),
            other => Err(cx.mismatch(self.expected(), other)),
        }
    }

    fn expected(&self) -> String {
        format!("\"{}\"", self.text)
    }
}

impl Encoder for LiteralNode {
    type Input = ();

    fn encode(&self, _: &()) -> Result<Value, EncodingError> {
        Ok(Value::String(self.text.clone()))
    }
}

/// Maps a closed set of strings onto values of `E`.
#[derive(Debug, Clone)]
pub struct OneOfNode<E> {
    options: Vec<(&'static str, E)>,
}

/// A node accepting one of the listed strings.
///
/// # Examples
///
/// ```
/// use record_codec_core::{Decoder, Encoder, one_of};
/// use serde_json::json;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Platform { Ios, Android }
///
/// let platform = one_of(&[("iOS", Platform::Ios), ("Android", Platform::Android)]);
/// assert_eq!(platform.decode(&json!("iOS")).unwrap(), Platform::Ios);
/// assert_eq!(platform.encode(&Platform::Android).unwrap(), json!("Android"));
/// assert!(platform.decode(&json!("web")).is_err());
/// ```
pub fn one_of<E>(options: &[(&'static str, E)]) -> OneOfNode<E>
where
    E: Copy + PartialEq + Send + Sync,
{
    OneOfNode {
        options: options.to_vec(),
    }
}

impl<E> Decoder for OneOfNode<E>
where
    E: Copy + PartialEq + Send + Sync,
{
    type Output = E;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<E, DecodeError> {
        let Value::String(text) = raw else {
            return Err(cx.mismatch(self.expected(), raw));
        };
        self.options
            .iter()
            .find(|(tag, _)| tag == text)
            .map(|(_, value)| *value)
            .ok_or_else(|| cx.issue(self.expected(), format!("\"{text}\"")))
    }

    fn expected(&self) -> String {
        self.options
            .iter()
            .map(|(tag, _)| format!("\"{tag}\""))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl<E> Encoder for OneOfNode<E>
where
    E: Copy + PartialEq + Send + Sync,
{
    type Input = E;

    fn encode(&self, value: &E) -> Result<Value, EncodingError> {
        self.options
            .iter()
            .find(|(_, candidate)| candidate == value)
            .map(|(tag, _)| Value::String((*tag).to_string()))
            .ok_or_else(|| EncodingError::Invariant(format!("value outside {}", self.expected())))
    }
}

/// Decodes every element of an array with the same node.
///
/// Issues from all elements are reported, each under its index.
#[derive(Debug, Clone)]
pub struct ArrayNode<N> {
    item: N,
}

/// An array node.
pub fn array<N: Decoder>(item: N) -> ArrayNode<N> {
    ArrayNode { item }
}

impl<N> ArrayNode<N> {
    /// The element node.
    pub fn item(&self) -> &N {
        &self.item
    }
}

impl<N: Decoder> Decoder for ArrayNode<N> {
    type Output = Vec<N::Output>;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        let Value::Array(items) = raw else {
            return Err(cx.mismatch(self.expected(), raw));
        };
        let mut decoded = Vec::with_capacity(items.len());
        let mut issues = ValidationError::default();
        for (index, item) in items.iter().enumerate() {
            match cx.at_index(index, |cx| self.item.decode_in(item, cx)) {
                Ok(value) => decoded.push(value),
                Err(DecodeError::Invalid(err)) => issues.absorb(err),
                Err(fatal) => return Err(fatal),
            }
        }
        if issues.is_empty() {
            Ok(decoded)
        } else {
            Err(issues.into())
        }
    }

    fn expected(&self) -> String {
        "array".to_string()
    }
}

impl<N: Encoder> Encoder for ArrayNode<N> {
    type Input = Vec<N::Input>;

    fn encode(&self, value: &Self::Input) -> Result<Value, EncodingError> {
        value
            .iter()
            .map(|item| self.item.encode(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

/// Decodes an object with arbitrary keys whose values share one node.
#[derive(Debug, Clone)]
pub struct StringMapNode<N> {
    value: N,
}

/// A string-keyed map node.
pub fn string_map<N: Decoder>(value: N) -> StringMapNode<N> {
    StringMapNode { value }
}

impl<N: Decoder> Decoder for StringMapNode<N> {
    type Output = BTreeMap<String, N::Output>;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        let Value::Object(entries) = raw else {
            return Err(cx.mismatch(self.expected(), raw));
        };
        let mut decoded = BTreeMap::new();
        let mut issues = ValidationError::default();
        for (key, value) in entries {
            match cx.at_key(key, |cx| self.value.decode_in(value, cx)) {
                Ok(value) => {
                    decoded.insert(key.clone(), value);
                }
                Err(DecodeError::Invalid(err)) => issues.absorb(err),
                Err(fatal) => return Err(fatal),
            }
        }
        if issues.is_empty() {
            Ok(decoded)
        } else {
            Err(issues.into())
        }
    }

    fn expected(&self) -> String {
        "object".to_string()
    }
}

impl<N: Encoder> Encoder for StringMapNode<N> {
    type Input = BTreeMap<String, N::Input>;

    fn encode(&self, value: &Self::Input) -> Result<Value, EncodingError> {
        let mut out = Map::new();
        for (key, item) in value {
            if let Some(encoded) = self.value.encode_field(item)? {
                out.insert(key.clone(), encoded);
            }
        }
        Ok(Value::Object(out))
    }
}

/// Describes `raw` for a `received` slot, quoting short strings.
pub(crate) fn describe(raw: &Value) -> String {
    match raw {
        Value::String(text) => format!("\"{text}\""),
        other => shape_of(other).to_string(),
    }
}
