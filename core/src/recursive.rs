//! Self-referential schema nodes.
//!
//! A node that contains itself (a questionnaire item whose children are
//! questionnaire items) cannot be built eagerly. [`Recursive`] holds a thunk
//! instead and only calls it when input actually reaches that position, so
//! building the graph never recurses. The resolved node is memoized in the
//! `Recursive` itself.

use std::fmt;
use std::sync::OnceLock;

use serde_json::Value;

use crate::context::DecodeContext;
use crate::error::{DecodeError, EncodingError};
use crate::node::{Decoder, Encoder, SharedNode};

type Thunk<T> = Box<dyn Fn() -> SharedNode<T> + Send + Sync>;

/// Lazily resolved reference to a node, usually the node that contains it.
pub struct Recursive<T> {
    label: &'static str,
    thunk: Thunk<T>,
    resolved: OnceLock<SharedNode<T>>,
    max_depth: Option<usize>,
}

/// Refers to a node through `thunk`, named `label` in issues.
///
/// The thunk typically returns a clone of a node kept in a `static`
/// [`OnceLock`], which makes the cycle explicit and shares one graph.
///
/// # Examples
///
/// ```
/// use std::sync::OnceLock;
///
/// use record_codec_core::*;
/// use serde_json::json;
///
/// #[derive(Debug, PartialEq)]
/// struct Node {
///     children: Vec<Node>,
/// }
///
/// struct NodeSchema {
///     children: ArrayNode<Recursive<Node>>,
/// }
///
/// fn node_schema() -> SharedNode<Node> {
///     static NODE: OnceLock<SharedNode<Node>> = OnceLock::new();
///     NODE.get_or_init(|| {
///         shared(NodeSchema { children: array(recursive("Node", node_schema)) })
///     })
///     .clone()
/// }
///
/// impl Decoder for NodeSchema {
///     type Output = Node;
///
///     fn decode_in(&self, raw: &serde_json::Value, cx: &mut DecodeContext) -> Result<Node, DecodeError> {
///         let object = ObjectView::new(raw, cx)?;
///         let children = object.field(cx, "children", &self.children)?;
///         Ok(Node { children })
///     }
///
///     fn expected(&self) -> String {
///         "Node".to_string()
///     }
/// }
///
/// impl Encoder for NodeSchema {
///     type Input = Node;
///
///     fn encode(&self, node: &Node) -> Result<serde_json::Value, EncodingError> {
///         let mut out = ObjectWriter::new();
///         out.field("children", &self.children, &node.children)?;
///         Ok(out.finish())
///     }
/// }
///
/// let tree = node_schema()
///     .decode(&json!({"children": [{"children": []}, {"children": [{"children": []}]}]}))
///     .unwrap();
/// assert_eq!(tree.children[1].children.len(), 1);
///
/// let too_deep = node_schema().decode_with(
///     &json!({"children": [{"children": [{"children": []}]}]}),
///     &DecodeOptions::default().with_max_depth(1),
/// );
/// assert!(matches!(too_deep, Err(DecodeError::DepthExceeded { limit: 1, .. })));
/// ```
pub fn recursive<T, F>(label: &'static str, thunk: F) -> Recursive<T>
where
    F: Fn() -> SharedNode<T> + Send + Sync + 'static,
{
    Recursive {
        label,
        thunk: Box::new(thunk),
        resolved: OnceLock::new(),
        max_depth: None,
    }
}

impl<T> Recursive<T> {
    /// Adds a depth guard specific to this reference.
    ///
    /// The tighter of this limit and the call's
    /// [`DecodeOptions::max_depth`](crate::DecodeOptions) applies.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Returns `true` once the thunk has been evaluated.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    fn resolve(&self) -> &SharedNode<T> {
        self.resolved.get_or_init(|| {
            tracing::trace!(label = self.label, "resolving recursive schema");
            (self.thunk)()
        })
    }
}

impl<T> fmt::Debug for Recursive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recursive")
            .field("label", &self.label)
            .field("resolved", &self.is_resolved())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<T> Decoder for Recursive<T> {
    type Output = T;

    fn decode_in(&self, raw: &Value, cx: &mut DecodeContext) -> Result<T, DecodeError> {
        cx.descend(self.max_depth, |cx| self.resolve().decode_in(raw, cx))
    }

    fn expected(&self) -> String {
        self.label.to_string()
    }
}

impl<T> Encoder for Recursive<T> {
    type Input = T;

    fn encode(&self, value: &T) -> Result<Value, EncodingError> {
        self.resolve().encode(value)
    }

    fn encode_field(&self, value: &T) -> Result<Option<Value>, EncodingError> {
        self.resolve().encode_field(value)
    }
}
