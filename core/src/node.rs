//! The codec traits every schema node implements.
//!
//! A node is built once and then only read, so both traits require
//! `Send + Sync` and take `&self`.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::context::{DecodeContext, DecodeOptions};
use crate::error::{DecodeError, EncodingError};
use crate::value::ABSENT;

/// Validates raw structural input into a typed value.
pub trait Decoder: Send + Sync {
    /// The value produced by a successful decode.
    type Output;

    /// Decodes `raw` at the position tracked by `cx`.
    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError>;

    /// Decodes a missing object key. Required by default.
    fn decode_absent(&self, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        Err(cx.issue(self.expected(), ABSENT))
    }

    /// Short description of the accepted shape, used in issues.
    fn expected(&self) -> String;

    /// Decodes `raw` from the root with default options.
    fn decode(&self, raw: &Value) -> Result<Self::Output, DecodeError> {
        self.decode_with(raw, &DecodeOptions::default())
    }

    /// Decodes `raw` from the root with explicit options.
    fn decode_with(&self, raw: &Value, options: &DecodeOptions) -> Result<Self::Output, DecodeError> {
        let mut cx = DecodeContext::new(*options);
        self.decode_in(raw, &mut cx)
    }
}

/// Projects a typed value back to raw structural form.
pub trait Encoder: Send + Sync {
    /// The value accepted for encoding.
    type Input;

    /// Encodes `value` as a standalone structural value.
    fn encode(&self, value: &Self::Input) -> Result<Value, EncodingError>;

    /// Encodes `value` as an object field; `None` means the key is omitted.
    fn encode_field(&self, value: &Self::Input) -> Result<Option<Value>, EncodingError> {
        self.encode(value).map(Some)
    }
}

/// A node that decodes and encodes the same logical type `T`.
pub trait SchemaNode<T>: Decoder<Output = T> + Encoder<Input = T> {}

impl<T, N> SchemaNode<T> for N where N: Decoder<Output = T> + Encoder<Input = T> + ?Sized {}

/// Shared, type-erased handle to a node.
pub type SharedNode<T> = Arc<dyn SchemaNode<T>>;

/// Erases `node` behind a [`SharedNode`].
pub fn shared<T, N>(node: N) -> SharedNode<T>
where
    N: SchemaNode<T> + 'static,
{
    Arc::new(node)
}

impl<N: Decoder + ?Sized> Decoder for Arc<N> {
    type Output = N::Output;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        (**self).decode_in(raw, cx)
    }

    fn decode_absent(&self, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        (**self).decode_absent(cx)
    }

    fn expected(&self) -> String {
        (**self).expected()
    }
}

impl<N: Encoder + ?Sized> Encoder for Arc<N> {
    type Input = N::Input;

    fn encode(&self, value: &Self::Input) -> Result<Value, EncodingError> {
        (**self).encode(value)
    }

    fn encode_field(&self, value: &Self::Input) -> Result<Option<Value>, EncodingError> {
        (**self).encode_field(value)
    }
}

/// Node adapter that converts between an inner node's type and `T`.
///
/// Built with [`map`] or [`try_map`].
pub struct Mapped<N, T, F, G> {
    inner: N,
    into: F,
    from: G,
    _marker: PhantomData<fn() -> T>,
}

/// Maps a node's value into `T` and back.
pub fn map<N, T, F, G>(
    inner: N,
    into: F,
    from: G,
) -> Mapped<N, T, impl Fn(N::Output) -> Result<T, String> + Send + Sync, G>
where
    N: Decoder,
    F: Fn(N::Output) -> T + Send + Sync,
    G: Fn(&T) -> N::Output + Send + Sync,
{
    Mapped {
        inner,
        into: move |value| Ok(into(value)),
        from,
        _marker: PhantomData,
    }
}

/// Like [`map`], but `into` may reject the value.
///
/// A rejection becomes a validation issue at the current path whose
/// `expected` is the returned message. Use this to run a domain
/// constructor that enforces invariants.
///
/// # Examples
///
/// ```
/// use record_codec_core::{Decoder, integer, try_map};
/// use serde_json::json;
///
/// let percent = try_map(
///     integer(),
///     |n| if (0..=100).contains(&n) { Ok(n as u8) } else { Err("integer in 0..=100".to_string()) },
///     |p: &u8| i64::from(*p),
/// );
/// assert_eq!(percent.decode(&json!(42)).unwrap(), 42);
/// assert!(percent.decode(&json!(420)).is_err());
/// ```
pub fn try_map<N, T, F, G>(inner: N, into: F, from: G) -> Mapped<N, T, F, G>
where
    N: Decoder,
    F: Fn(N::Output) -> Result<T, String> + Send + Sync,
    G: Fn(&T) -> N::Output + Send + Sync,
{
    Mapped {
        inner,
        into,
        from,
        _marker: PhantomData,
    }
}

impl<N, T, F, G> Decoder for Mapped<N, T, F, G>
where
    N: Decoder,
    F: Fn(N::Output) -> Result<T, String> + Send + Sync,
    G: Send + Sync,
{
    type Output = T;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<T, DecodeError> {
        let value = self.inner.decode_in(raw, cx)?;
        (self.into)(value).map_err(|expected| cx.issue(expected, "value violating constraint"))
    }

    fn decode_absent(&self, cx: &mut DecodeContext) -> Result<T, DecodeError> {
        let value = self.inner.decode_absent(cx)?;
        (self.into)(value).map_err(|expected| cx.issue(expected, ABSENT))
    }

    fn expected(&self) -> String {
        self.inner.expected()
    }
}

impl<N, T, F, G> Encoder for Mapped<N, T, F, G>
where
    N: Decoder + Encoder<Input = <N as Decoder>::Output>,
    F: Send + Sync,
    G: Fn(&T) -> <N as Decoder>::Output + Send + Sync,
{
    type Input = T;

    fn encode(&self, value: &T) -> Result<Value, EncodingError> {
        self.inner.encode(&(self.from)(value))
    }

    fn encode_field(&self, value: &T) -> Result<Option<Value>, EncodingError> {
        self.inner.encode_field(&(self.from)(value))
    }
}
