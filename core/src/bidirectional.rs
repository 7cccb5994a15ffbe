//! Pairing of a decode-side node with an encode-side node.

use std::sync::Arc;

use serde_json::Value;

use crate::context::DecodeContext;
use crate::error::{CodecError, DecodeError, EncodingError};
use crate::node::{Decoder, Encoder};

/// One logical type with its decoder and its encoder.
///
/// The encoder's input type is the decoder's output type; the compiler checks
/// the pairing when the schema is built. Both halves are shared, so cloning
/// a schema is cheap.
///
/// # Examples
///
/// ```
/// use record_codec_core::{BidirectionalSchema, Decoder, Encoder, integer};
/// use serde_json::json;
///
/// let count = BidirectionalSchema::simple(integer());
/// let value = count.decode(&json!(7)).unwrap();
/// assert_eq!(count.encode(&value).unwrap(), json!(7));
/// ```
pub struct BidirectionalSchema<F, B = F> {
    forward: Arc<F>,
    backward: Arc<B>,
}

impl<S> BidirectionalSchema<S, S>
where
    S: Decoder + Encoder<Input = <S as Decoder>::Output>,
{
    /// Uses one node for both directions.
    pub fn simple(schema: S) -> Self {
        let schema = Arc::new(schema);
        Self {
            forward: Arc::clone(&schema),
            backward: schema,
        }
    }
}

impl<F, B> BidirectionalSchema<F, B>
where
    F: Decoder,
    B: Encoder<Input = F::Output>,
{
    /// Uses distinct nodes for decoding and encoding.
    pub fn separate(forward: F, backward: B) -> Self {
        Self {
            forward: Arc::new(forward),
            backward: Arc::new(backward),
        }
    }

    /// The decode-side node.
    pub fn forward(&self) -> &F {
        &self.forward
    }

    /// The encode-side node.
    pub fn backward(&self) -> &B {
        &self.backward
    }

    /// Decodes `raw` and immediately encodes the result.
    pub fn round_trip(&self, raw: &Value) -> Result<Value, CodecError> {
        let value = self.forward.decode(raw)?;
        Ok(self.backward.encode(&value)?)
    }
}

impl<F, B> Clone for BidirectionalSchema<F, B> {
    fn clone(&self) -> Self {
        Self {
            forward: Arc::clone(&self.forward),
            backward: Arc::clone(&self.backward),
        }
    }
}

impl<F, B> Decoder for BidirectionalSchema<F, B>
where
    F: Decoder,
    B: Send + Sync,
{
    type Output = F::Output;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<F::Output, DecodeError> {
        self.forward.decode_in(raw, cx)
    }

    fn decode_absent(&self, cx: &mut DecodeContext) -> Result<F::Output, DecodeError> {
        self.forward.decode_absent(cx)
    }

    fn expected(&self) -> String {
        self.forward.expected()
    }
}

impl<F, B> Encoder for BidirectionalSchema<F, B>
where
    F: Send + Sync,
    B: Encoder,
{
    type Input = B::Input;

    fn encode(&self, value: &B::Input) -> Result<Value, EncodingError> {
        self.backward.encode(value)
    }

    fn encode_field(&self, value: &B::Input) -> Result<Option<Value>, EncodingError> {
        self.backward.encode_field(value)
    }
}
