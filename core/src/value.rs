//! Path and shape vocabulary shared by every codec.
//!
//! Raw input is a [`serde_json::Value`] tree. Failures point into that tree
//! with a [`Path`] and describe what was found there with [`shape_of`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape reported for an object key that is not present at all.
pub const ABSENT: &str = "undefined";

/// One step into a structural value: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field name inside an object.
    Key(String),
    /// Position inside an array.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Location of a value inside a structural tree, root first.
///
/// Displays as `$` for the root and as `entry[1].resource.code` otherwise.
///
/// # Examples
///
/// ```
/// use record_codec_core::{Path, PathSegment};
///
/// let path = Path::from(vec![
///     PathSegment::from("entry"),
///     PathSegment::from(1),
///     PathSegment::from("resource"),
/// ]);
/// assert_eq!(path.to_string(), "entry[1].resource");
/// assert_eq!(Path::root().to_string(), "$");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The empty path, pointing at the value being decoded.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Segments from the root down.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns a copy of this path with `segment` appended.
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns `prefix` followed by this path.
    pub fn prefixed(&self, prefix: &Path) -> Self {
        let mut segments = prefix.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if position > 0 => write!(f, ".{key}")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

/// Names the JSON kind of `value` for `expected`/`received` descriptions.
pub fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
