//! RFC 3339 timestamps carried as JSON strings.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::bidirectional::BidirectionalSchema;
use crate::context::DecodeContext;
use crate::error::{DecodeError, EncodingError};
use crate::node::{Decoder, Encoder};
use crate::primitives::describe;

/// Parses RFC 3339 text into a UTC instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeDecoder;

/// Formats a UTC instant as RFC 3339 text with a `Z` suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeEncoder;

/// Timestamp schema: text on the wire, `DateTime<Utc>` in the domain.
pub type DateTimeSchema = BidirectionalSchema<DateTimeDecoder, DateTimeEncoder>;

/// A timestamp node.
///
/// # Examples
///
/// ```
/// use record_codec_core::{Decoder, Encoder, date_time};
/// use serde_json::json;
///
/// let node = date_time();
/// let at = node.decode(&json!("2024-03-01T09:30:00+01:00")).unwrap();
/// assert_eq!(node.encode(&at).unwrap(), json!("2024-03-01T08:30:00Z"));
/// ```
pub fn date_time() -> DateTimeSchema {
    BidirectionalSchema::separate(DateTimeDecoder, DateTimeEncoder)
}

impl Decoder for DateTimeDecoder {
    type Output = DateTime<Utc>;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<DateTime<Utc>, DecodeError> {
        let parsed = match raw {
            Value::String(text) => DateTime::parse_from_rfc3339(text).ok(),
            _ => None,
        };
        parsed
            .map(|at| at.with_timezone(&Utc))
            .ok_or_else(|| cx.issue(self.expected(), describe(raw)))
    }

    fn expected(&self) -> String {
        "date-time string".to_string()
    }
}

impl Encoder for DateTimeEncoder {
    type Input = DateTime<Utc>;

    fn encode(&self, value: &DateTime<Utc>) -> Result<Value, EncodingError> {
        Ok(Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rejects_non_rfc3339_text() {
        let err = date_time().decode(&json!("yesterday")).unwrap_err();
        assert_eq!(err.issues()[0].expected, "date-time string");
        assert_eq!(err.issues()[0].received, "\"yesterday\"");
    }

    #[test]
    fn test_keeps_fractional_seconds() {
        let node = date_time();
        let at = node.decode(&json!("2023-11-05T10:00:00.250Z")).unwrap();
        assert_eq!(node.encode(&at).unwrap(), json!("2023-11-05T10:00:00.250Z"));
    }
}
