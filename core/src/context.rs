//! Per-call decoding state: the current path and the recursion depth guard.

use serde_json::Value;

use crate::error::{DecodeError, ValidationIssue};
use crate::value::{Path, PathSegment, shape_of};

/// Default number of nested recursive-schema levels a decode call may enter.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Caller-supplied knobs for a decode call.
///
/// # Examples
///
/// ```
/// use record_codec_core::{DEFAULT_MAX_DEPTH, DecodeOptions};
///
/// assert_eq!(DecodeOptions::default().max_depth, Some(DEFAULT_MAX_DEPTH));
/// assert_eq!(DecodeOptions::unbounded().max_depth, None);
/// assert_eq!(DecodeOptions::default().with_max_depth(8).max_depth, Some(8));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum number of nested recursive-schema levels; `None` disables the guard.
    pub max_depth: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl DecodeOptions {
    /// Options without a depth guard.
    pub fn unbounded() -> Self {
        Self { max_depth: None }
    }

    /// Replaces the depth guard.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

/// Mutable state threaded through one decode call.
///
/// Containers push a [`PathSegment`] while decoding a child so that every
/// issue carries the full path from the root.
#[derive(Debug)]
pub struct DecodeContext {
    path: Vec<PathSegment>,
    depth: usize,
    options: DecodeOptions,
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

impl DecodeContext {
    /// Starts a decode call at the root.
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            path: Vec::new(),
            depth: 0,
            options,
        }
    }

    /// Path to the value currently being decoded.
    pub fn path(&self) -> Path {
        Path::from(self.path.clone())
    }

    /// Number of recursive-schema levels currently entered.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Options for this call.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Runs `f` with `key` appended to the path.
    pub fn at_key<T>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.at(PathSegment::Key(key.to_string()), f)
    }

    /// Runs `f` with `index` appended to the path.
    pub fn at_index<T>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> T) -> T {
        self.at(PathSegment::Index(index), f)
    }

    fn at<T>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(segment);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Builds a single-issue error at the current path.
    pub fn issue(&self, expected: impl Into<String>, received: impl Into<String>) -> DecodeError {
        ValidationIssue::new(self.path(), expected, received).into()
    }

    /// Builds a single-issue error describing `raw` by its JSON kind.
    pub fn mismatch(&self, expected: impl Into<String>, raw: &Value) -> DecodeError {
        self.issue(expected, shape_of(raw))
    }

    /// Enters one recursive level, failing cleanly once the tighter of
    /// `node_limit` and the call's own guard is reached.
    pub fn descend<T>(
        &mut self,
        node_limit: Option<usize>,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let limit = match (node_limit, self.options.max_depth) {
            (Some(node), Some(call)) => Some(node.min(call)),
            (node, call) => node.or(call),
        };
        if let Some(limit) = limit {
            if self.depth >= limit {
                return Err(DecodeError::DepthExceeded {
                    path: self.path(),
                    limit,
                });
            }
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }
}
