//! Null-normalization combinators.
//!
//! Stored documents write "no value" in several ways: the key is missing,
//! or it is present with `null`. These nodes treat both the same way and
//! leave every other input to the wrapped node untouched.

use serde_json::Value;

use crate::context::DecodeContext;
use crate::error::{DecodeError, EncodingError};
use crate::node::{Decoder, Encoder};

/// Decodes `null` or a missing key as `None`.
#[derive(Debug, Clone)]
pub struct Optionalish<N> {
    inner: N,
}

/// Wraps `inner` so that null and absent input decode to `None`.
///
/// Any other input is handed to `inner` and its issues are passed through
/// unchanged. As an object field, `None` is omitted on encode rather than
/// written as `null`.
///
/// # Examples
///
/// ```
/// use record_codec_core::{Decoder, Encoder, optionalish, string};
/// use serde_json::json;
///
/// let node = optionalish(string());
/// assert_eq!(node.decode(&json!(null)).unwrap(), None);
/// assert_eq!(node.decode(&json!("en")).unwrap(), Some("en".to_string()));
/// assert_eq!(node.encode_field(&None).unwrap(), None);
/// ```
pub fn optionalish<N: Decoder>(inner: N) -> Optionalish<N> {
    Optionalish { inner }
}

impl<N> Optionalish<N> {
    /// The wrapped node.
    pub fn inner(&self) -> &N {
        &self.inner
    }
}

impl<N: Decoder> Decoder for Optionalish<N> {
    type Output = Option<N::Output>;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        match raw {
            Value::Null => Ok(None),
            other => self.inner.decode_in(other, cx).map(Some),
        }
    }

    fn decode_absent(&self, _cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        Ok(None)
    }

    fn expected(&self) -> String {
        format!("{} | null", self.inner.expected())
    }
}

impl<N: Encoder> Encoder for Optionalish<N> {
    type Input = Option<N::Input>;

    fn encode(&self, value: &Self::Input) -> Result<Value, EncodingError> {
        match value {
            Some(value) => self.inner.encode(value),
            None => Ok(Value::Null),
        }
    }

    fn encode_field(&self, value: &Self::Input) -> Result<Option<Value>, EncodingError> {
        match value {
            Some(value) => self.inner.encode_field(value),
            None => Ok(None),
        }
    }
}

/// Decodes `null` or a missing key as a fixed default value.
#[derive(Debug, Clone)]
pub struct OptionalishDefault<N: Decoder> {
    inner: N,
    default: N::Output,
}

/// Wraps `inner` so that null and absent input decode to `default`.
///
/// `default` is trusted as given: it is not run through `inner`, so a
/// default that `inner` would reject is still returned for null input.
///
/// # Examples
///
/// ```
/// use record_codec_core::{Decoder, non_empty_string, optionalish_default};
/// use serde_json::json;
///
/// let node = optionalish_default(non_empty_string(), String::new());
/// assert_eq!(node.decode(&json!(null)).unwrap(), "");
/// assert!(node.decode(&json!("")).is_err());
/// ```
pub fn optionalish_default<N>(inner: N, default: N::Output) -> OptionalishDefault<N>
where
    N: Decoder,
    N::Output: Clone + Send + Sync,
{
    OptionalishDefault { inner, default }
}

impl<N: Decoder> OptionalishDefault<N> {
    /// The substituted value.
    pub fn default_value(&self) -> &N::Output {
        &self.default
    }
}

impl<N> Decoder for OptionalishDefault<N>
where
    N: Decoder,
    N::Output: Clone + Send + Sync,
{
    type Output = N::Output;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        match raw {
            Value::Null => Ok(self.default.clone()),
            other => self.inner.decode_in(other, cx),
        }
    }

    fn decode_absent(&self, _cx: &mut DecodeContext) -> Result<Self::Output, DecodeError> {
        Ok(self.default.clone())
    }

    fn expected(&self) -> String {
        format!("{} | null", self.inner.expected())
    }
}

impl<N> Encoder for OptionalishDefault<N>
where
    N: Decoder + Encoder,
    <N as Decoder>::Output: Send + Sync,
{
    type Input = <N as Encoder>::Input;

    fn encode(&self, value: &Self::Input) -> Result<Value, EncodingError> {
        self.inner.encode(value)
    }

    fn encode_field(&self, value: &Self::Input) -> Result<Option<Value>, EncodingError> {
        self.inner.encode_field(value)
    }
}
