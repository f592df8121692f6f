//! Ergonomic construction of document trees for tests and embedders.
//!
//! ```
//! use treeq::model::builder::{alias, anchor, map, seq};
//! use treeq::model::NodeTree;
//!
//! // base: &base {a: 2}
//! // child: {<<: *base, a: 1, list: [1, 2]}
//! let doc = map()
//!     .entry("base", anchor("base", map().entry("a", 2)))
//!     .entry(
//!         "child",
//!         map().merge(alias("base")).entry("a", 1).entry("list", seq().item(1).item(2)),
//!     );
//! let mut tree = NodeTree::new();
//! let root = doc.build_document(&mut tree);
//! assert_eq!(tree.render(root), "{base: {a: 2}, child: {<<: {a: 2}, a: 1, list: [1, 2]}}");
//! ```
use std::collections::HashMap;

use super::{MapEntry, Node, NodeId, NodeTree, Scalar};

#[derive(Debug, Clone, PartialEq)]
pub enum NodeBuilder {
    Mapping(Vec<(NodeBuilder, NodeBuilder)>),
    Sequence(Vec<NodeBuilder>),
    Scalar(Scalar),
    Anchor(String, Box<NodeBuilder>),
    Alias(String),
}

pub fn map() -> NodeBuilder {
    NodeBuilder::Mapping(Vec::new())
}

pub fn seq() -> NodeBuilder {
    NodeBuilder::Sequence(Vec::new())
}

pub fn null() -> NodeBuilder {
    NodeBuilder::Scalar(Scalar::null())
}

pub fn scalar(scalar: Scalar) -> NodeBuilder {
    NodeBuilder::Scalar(scalar)
}

pub fn anchor(name: &str, node: impl Into<NodeBuilder>) -> NodeBuilder {
    NodeBuilder::Anchor(name.to_string(), Box::new(node.into()))
}

pub fn alias(name: &str) -> NodeBuilder {
    NodeBuilder::Alias(name.to_string())
}

impl NodeBuilder {
    /// Add a `key: value` entry. No-op on anything but a mapping.
    #[must_use]
    pub fn entry(mut self, key: impl Into<NodeBuilder>, value: impl Into<NodeBuilder>) -> Self {
        if let NodeBuilder::Mapping(entries) = &mut self {
            entries.push((key.into(), value.into()));
        }
        self
    }

    /// Add a `<<: value` merge entry.
    #[must_use]
    pub fn merge(self, value: impl Into<NodeBuilder>) -> Self {
        self.entry(NodeBuilder::Scalar(Scalar::merge()), value)
    }

    /// Append an item. No-op on anything but a sequence.
    #[must_use]
    pub fn item(mut self, value: impl Into<NodeBuilder>) -> Self {
        if let NodeBuilder::Sequence(items) = &mut self {
            items.push(value.into());
        }
        self
    }

    pub fn build(&self, tree: &mut NodeTree) -> NodeId {
        let mut anchors = HashMap::new();
        self.build_with(tree, &mut anchors)
    }

    /// Build wrapped in a document node, the shape decoders produce.
    pub fn build_document(&self, tree: &mut NodeTree) -> NodeId {
        let body = self.build(tree);
        tree.alloc(Node::Document(body))
    }

    fn build_with(&self, tree: &mut NodeTree, anchors: &mut HashMap<String, NodeId>) -> NodeId {
        match self {
            NodeBuilder::Mapping(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| MapEntry {
                        key: k.build_with(tree, anchors),
                        value: v.build_with(tree, anchors),
                    })
                    .collect();
                tree.alloc(Node::Mapping(entries))
            }
            NodeBuilder::Sequence(items) => {
                let items = items.iter().map(|i| i.build_with(tree, anchors)).collect();
                tree.alloc(Node::Sequence(items))
            }
            NodeBuilder::Scalar(s) => tree.alloc_scalar(s.clone()),
            NodeBuilder::Anchor(name, inner) => {
                let id = inner.build_with(tree, anchors);
                tree.set_anchor(id, name.as_str());
                anchors.insert(name.clone(), id);
                id
            }
            // unknown anchors degrade to null, like an undefined YAML alias would fail to load
            NodeBuilder::Alias(name) => match anchors.get(name) {
                Some(target) => tree.alloc(Node::Alias(*target)),
                None => tree.alloc(Node::null()),
            },
        }
    }
}

impl From<&str> for NodeBuilder {
    fn from(value: &str) -> Self {
        NodeBuilder::Scalar(Scalar::string(value))
    }
}

impl From<String> for NodeBuilder {
    fn from(value: String) -> Self {
        NodeBuilder::Scalar(Scalar::string(value))
    }
}

impl From<i64> for NodeBuilder {
    fn from(value: i64) -> Self {
        NodeBuilder::Scalar(Scalar::int(value))
    }
}

impl From<i32> for NodeBuilder {
    fn from(value: i32) -> Self {
        NodeBuilder::Scalar(Scalar::int(i64::from(value)))
    }
}

impl From<f64> for NodeBuilder {
    fn from(value: f64) -> Self {
        NodeBuilder::Scalar(Scalar::float(value))
    }
}

impl From<bool> for NodeBuilder {
    fn from(value: bool) -> Self {
        NodeBuilder::Scalar(Scalar::bool(value))
    }
}

impl From<Scalar> for NodeBuilder {
    fn from(value: Scalar) -> Self {
        NodeBuilder::Scalar(value)
    }
}
