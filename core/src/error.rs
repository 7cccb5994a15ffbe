//! Error taxonomy for decoding, encoding, and schema construction.
//!
//! Decoding reports every shape mismatch it finds as an ordered list of
//! [`ValidationIssue`]s. An unregistered discriminant or an exceeded depth
//! limit aborts the whole decode call instead.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::value::Path;

/// A single shape mismatch at a location in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Where the mismatch was found.
    pub path: Path,
    /// Description of the shape the schema wanted.
    pub expected: String,
    /// Description of the shape that was present.
    pub received: String,
}

impl ValidationIssue {
    /// Creates an issue at `path`.
    pub fn new(path: Path, expected: impl Into<String>, received: impl Into<String>) -> Self {
        Self {
            path,
            expected: expected.into(),
            received: received.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, received {}",
            self.path, self.expected, self.received
        )
    }
}

/// Ordered list of validation issues from one decode call.
///
/// Issues appear in the order the schema visited the input: object fields in
/// declaration order, array items by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Wraps a single issue.
    pub fn single(issue: ValidationIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// The issues, in visiting order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Consumes the error and returns its issues.
    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    /// Returns `true` if no issue has been recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of recorded issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Appends every issue of `other`, keeping order.
    pub fn absorb(&mut self, other: ValidationError) {
        self.issues.extend(other.issues);
    }
}

impl From<ValidationIssue> for ValidationError {
    fn from(issue: ValidationIssue) -> Self {
        Self::single(issue)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.issues.len();
        write!(
            f,
            "{count} validation issue{}",
            if count == 1 { "" } else { "s" }
        )?;
        for (position, issue) in self.issues.iter().enumerate() {
            f.write_str(if position == 0 { ": " } else { "; " })?;
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A tagged item carried a discriminant value no branch is registered for.
///
/// `value` is `None` when the discriminant field was missing entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownDiscriminantError {
    /// Location of the tagged item.
    pub path: Path,
    /// Name of the discriminant field.
    pub field: String,
    /// Offending value: the tag itself for strings, JSON text otherwise.
    pub value: Option<String>,
    /// Every registered value, in registration order.
    pub known: Vec<String>,
}

impl fmt::Display for UnknownDiscriminantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "unknown discriminant `{value}` for field `{}` at {}",
                self.field, self.path
            )?,
            None => write!(
                f,
                "missing discriminant field `{}` at {}",
                self.field, self.path
            )?,
        }
        write!(f, "; known values: {}", self.known.join(", "))
    }
}

impl std::error::Error for UnknownDiscriminantError {}

/// Failure of a decode call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// One or more shape mismatches.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// A tagged item could not be dispatched.
    #[error(transparent)]
    UnknownDiscriminant(#[from] UnknownDiscriminantError),

    /// Nested recursive input exceeded the configured depth guard.
    #[error("maximum recursion depth {limit} exceeded at {path}")]
    DepthExceeded {
        /// Location where the guard tripped.
        path: Path,
        /// The limit that was in force.
        limit: usize,
    },
}

impl DecodeError {
    /// Validation issues carried by this error; empty for the fatal variants.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            DecodeError::Invalid(err) => err.issues(),
            _ => &[],
        }
    }
}

impl From<ValidationIssue> for DecodeError {
    fn from(issue: ValidationIssue) -> Self {
        DecodeError::Invalid(ValidationError::single(issue))
    }
}

/// A domain value could not be projected back to wire form.
///
/// These indicate a broken encoder assumption rather than bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The value's own discriminant has no registered branch.
    #[error("no branch registered for `{field}` = \"{tag}\"")]
    UnregisteredVariant {
        /// Discriminant field of the union.
        field: String,
        /// Discriminant reported by the value.
        tag: String,
    },

    /// The branch selected by the value's discriminant does not accept it.
    #[error("value tagged \"{tag}\" is not accepted by its branch encoder")]
    VariantMismatch {
        /// Discriminant reported by the value.
        tag: String,
    },

    /// NaN and infinities have no JSON form.
    #[error("non-finite number cannot be encoded")]
    NonFiniteNumber,

    /// Any other encoder-assumed invariant.
    #[error("encoder invariant violated: {0}")]
    Invariant(String),
}

/// A schema graph was assembled inconsistently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaBuildError {
    /// Two union branches share a discriminant value.
    #[error("duplicate discriminant `{field}` = \"{value}\"")]
    DuplicateDiscriminant {
        /// Discriminant field of the union.
        field: String,
        /// Value registered twice.
        value: String,
    },

    /// A field-set layer redefines a key claimed by an earlier layer.
    #[error("field `{0}` is already defined by an earlier layer")]
    DuplicateField(String),

    /// Two registry entries share a type name.
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    /// A discriminated union was built without any branch.
    #[error("discriminated union over `{0}` has no branches")]
    EmptyUnion(String),

    /// A composite asked for a type that was not registered before it.
    #[error("type `{0}` must be registered before the schemas that embed it")]
    MissingType(String),
}

/// Decode or encode failure surfaced through a type-erased entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Decoding failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Encoding failed.
    #[error(transparent)]
    Encode(#[from] EncodingError),

    /// No schema is registered under the requested type name.
    #[error("unknown type: {0}")]
    UnknownType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_lists_issues_in_order() {
        let mut err = ValidationError::single(ValidationIssue::new(
            Path::root().join("platform"),
            "string",
            "number",
        ));
        err.absorb(ValidationError::single(ValidationIssue::new(
            Path::root().join("notificationToken"),
            "string",
            "undefined",
        )));

        assert_eq!(
            err.to_string(),
            "2 validation issues: platform: expected string, received number; \
             notificationToken: expected string, received undefined"
        );
    }

    #[test]
    fn test_unknown_discriminant_display_names_value_and_known_set() {
        let err = UnknownDiscriminantError {
            path: Path::root().join(2usize),
            field: "resourceType".to_string(),
            value: Some("Encounter".to_string()),
            known: vec!["Observation".to_string(), "Patient".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown discriminant `Encounter` for field `resourceType` at [2]; \
             known values: Observation, Patient"
        );
    }

    #[test]
    fn test_missing_discriminant_display() {
        let err = UnknownDiscriminantError {
            path: Path::root(),
            field: "kind".to_string(),
            value: None,
            known: vec!["a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing discriminant field `kind` at $; known values: a"
        );
    }

    #[test]
    fn test_fatal_variants_carry_no_issues() {
        let err = DecodeError::DepthExceeded {
            path: Path::root(),
            limit: 4,
        };
        assert!(err.issues().is_empty());
    }
}
