//! Opaque key/value payloads carried through a codec unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::DecodeContext;
use crate::error::{DecodeError, EncodingError};
use crate::node::{Decoder, Encoder};

/// An object whose keys are not described by any schema.
///
/// Domain types expose it only behind an explicit variant, so callers
/// match on that variant before reading keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpenRecord(Map<String, Value>);

impl OpenRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for OpenRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Accepts any object and keeps every key.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRecordNode;

/// An open record node.
pub fn open_record() -> OpenRecordNode {
    OpenRecordNode
}

impl Decoder for OpenRecordNode {
    type Output = OpenRecord;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<OpenRecord, DecodeError> {
        match raw {
            Value::Object(map) => Ok(OpenRecord(map.clone())),
            other => Err(cx.mismatch(self.expected(), other)),
        }
    }

    fn expected(&self) -> String {
        "object".to_string()
    }
}

impl Encoder for OpenRecordNode {
    type Input = OpenRecord;

    fn encode(&self, value: &OpenRecord) -> Result<Value, EncodingError> {
        Ok(Value::Object(value.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_keeps_unknown_keys() {
        let raw = json!({"valueSignature": {"who": "x"}, "score": 3});
        let record = open_record().decode(&raw).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("score"), Some(&json!(3)));
        assert_eq!(open_record().encode(&record).unwrap(), raw);
    }

    #[test]
    fn test_rejects_non_object() {
        let err = open_record().decode(&json!([1])).unwrap_err();
        assert_eq!(err.issues()[0].received, "array");
    }
}
