//! Arena-backed document tree.
//!
//! Every node of a document lives in a [`NodeTree`] and is addressed by a
//! stable [`NodeId`]. Containers reference their children by id, so several
//! candidates (and aliases) may point at the same subtree. Mutation happens by
//! overwriting a slot with [`NodeTree::replace`]; every holder of the id sees
//! the new value immediately.

use core::fmt;
use itertools::Itertools;
use std::collections::HashMap;

pub mod builder;
pub mod scalar;

pub use scalar::{Scalar, ScalarTag};

/// Stable handle of a node inside one [`NodeTree`].
///
/// Ids are only meaningful for the tree that allocated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Mapping,
    Sequence,
    Scalar,
    Alias,
    Document,
}

/// One `key: value` pair of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub key: NodeId,
    pub value: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ordered entries; a key tagged [`ScalarTag::Merge`] is the `<<` merge key.
    Mapping(Vec<MapEntry>),
    Sequence(Vec<NodeId>),
    Scalar(Scalar),
    /// Reference to another node of the same tree (YAML `*anchor`).
    Alias(NodeId),
    /// Wraps the body of a parsed document.
    Document(NodeId),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Mapping(_) => NodeKind::Mapping,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Scalar(_) => NodeKind::Scalar,
            Node::Alias(_) => NodeKind::Alias,
            Node::Document(_) => NodeKind::Document,
        }
    }

    pub fn null() -> Self {
        Node::Scalar(Scalar::null())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(s) if s.tag == ScalarTag::Null)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
    /// Anchor names of slots that aliases may point at.
    anchors: HashMap<NodeId, String>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn alloc_scalar(&mut self, scalar: Scalar) -> NodeId {
        self.alloc(Node::Scalar(scalar))
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Overwrite the slot `id` in place. This is the only mutation of an
    /// existing node; containers holding `id` observe the new value.
    pub fn replace(&mut self, id: NodeId, node: Node) {
        self.nodes[id.0] = node;
    }

    /// Follow alias and document wrappers until a mapping, sequence or scalar
    /// is reached. Alias cycles stop after visiting every slot once.
    pub fn resolve(&self, id: NodeId) -> NodeId {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.get(current) {
                Node::Alias(target) | Node::Document(target) => current = *target,
                _ => return current,
            }
        }
        current
    }

    /// Like [`NodeTree::resolve`] but only unwraps documents.
    pub fn unwrap_document(&self, id: NodeId) -> NodeId {
        match self.get(id) {
            Node::Document(body) => *body,
            _ => id,
        }
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.get(id).kind()
    }

    /// Name the slot `id` so aliases to it can be written back as `*name`.
    pub fn set_anchor(&mut self, id: NodeId, name: impl Into<String>) {
        self.anchors.insert(id, name.into());
    }

    pub fn anchor(&self, id: NodeId) -> Option<&str> {
        self.anchors.get(&id).map(String::as_str)
    }

    pub fn scalar(&self, id: NodeId) -> Option<&Scalar> {
        match self.get(id) {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn entries(&self, id: NodeId) -> Option<&[MapEntry]> {
        match self.get(id) {
            Node::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn items(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.get(id) {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_merge_key(&self, id: NodeId) -> bool {
        matches!(self.get(id), Node::Scalar(s) if s.tag == ScalarTag::Merge)
    }

    /// Append an entry to the mapping at `map`. Returns `false` when `map` is
    /// not a mapping.
    pub fn push_entry(&mut self, map: NodeId, key: NodeId, value: NodeId) -> bool {
        match &mut self.nodes[map.0] {
            Node::Mapping(entries) => {
                entries.push(MapEntry { key, value });
                true
            }
            _ => false,
        }
    }

    /// Append an item to the sequence at `seq`. Returns `false` when `seq` is
    /// not a sequence.
    pub fn push_item(&mut self, seq: NodeId, item: NodeId) -> bool {
        match &mut self.nodes[seq.0] {
            Node::Sequence(items) => {
                items.push(item);
                true
            }
            _ => false,
        }
    }

    /// Allocate a fresh copy of the subtree at `id`. Aliases are copied as
    /// aliases, their targets are shared.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let node = self.copy_node(id);
        self.alloc(node)
    }

    /// Copy of the node at `id` whose children are fresh copies, ready to be
    /// written into another slot.
    pub fn copy_node(&mut self, id: NodeId) -> Node {
        match self.get(id).clone() {
            Node::Mapping(entries) => Node::Mapping(
                entries
                    .into_iter()
                    .map(|e| MapEntry { key: self.deep_copy(e.key), value: self.deep_copy(e.value) })
                    .collect(),
            ),
            Node::Sequence(items) => {
                Node::Sequence(items.into_iter().map(|i| self.deep_copy(i)).collect())
            }
            Node::Document(body) => Node::Document(self.deep_copy(body)),
            other @ (Node::Scalar(_) | Node::Alias(_)) => other,
        }
    }

    /// Import the subtree `id` of `other` into this tree. Every slot is
    /// imported once, so aliases keep pointing at their (imported) anchor
    /// and anchor names carry over.
    pub fn graft(&mut self, other: &NodeTree, id: NodeId) -> NodeId {
        let mut imported = HashMap::new();
        self.graft_with(other, id, &mut imported)
    }

    fn graft_with(
        &mut self,
        other: &NodeTree,
        id: NodeId,
        imported: &mut HashMap<NodeId, NodeId>,
    ) -> NodeId {
        if let Some(done) = imported.get(&id) {
            return *done;
        }
        let node = match other.get(id) {
            Node::Mapping(entries) => Node::Mapping(
                entries
                    .iter()
                    .map(|e| MapEntry {
                        key: self.graft_with(other, e.key, imported),
                        value: self.graft_with(other, e.value, imported),
                    })
                    .collect(),
            ),
            Node::Sequence(items) => {
                Node::Sequence(items.iter().map(|i| self.graft_with(other, *i, imported)).collect())
            }
            Node::Document(body) => Node::Document(self.graft_with(other, *body, imported)),
            Node::Alias(target) => Node::Alias(self.graft_with(other, *target, imported)),
            Node::Scalar(s) => Node::Scalar(s.clone()),
        };
        let new_id = self.alloc(node);
        if let Some(name) = other.anchor(id) {
            self.set_anchor(new_id, name);
        }
        imported.insert(id, new_id);
        new_id
    }

    /// Structural equality after resolving aliases and documents. Numbers
    /// compare by value, other scalars by tag class and text.
    pub fn deep_equal(&self, a: NodeId, b: NodeId) -> bool {
        let (a, b) = (self.resolve(a), self.resolve(b));
        match (self.get(a), self.get(b)) {
            (Node::Scalar(x), Node::Scalar(y)) => x.loosely_equals(y),
            (Node::Sequence(xs), Node::Sequence(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.deep_equal(*x, *y))
            }
            (Node::Mapping(xs), Node::Mapping(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(x, y)| {
                        self.deep_equal(x.key, y.key) && self.deep_equal(x.value, y.value)
                    })
            }
            _ => false,
        }
    }

    /// Compact flow-style rendering, e.g. `{a: [1, 2]}`. Strings that would
    /// read back as another type are quoted, so `1` and `'1'` render apart.
    /// Used for dedup keys and diagnostics.
    pub fn render(&self, id: NodeId) -> String {
        match self.get(self.resolve(id)) {
            Node::Scalar(s) => s.to_yaml_text().into_owned(),
            Node::Sequence(items) => {
                format!("[{}]", items.iter().map(|i| self.render(*i)).join(", "))
            }
            Node::Mapping(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|e| format!("{}: {}", self.render(e.key), self.render(e.value)))
                    .join(", ")
            ),
            // resolve() only stops on these for alias cycles
            Node::Alias(_) | Node::Document(_) => String::from("*cycle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_is_visible_through_every_holder() {
        let mut tree = NodeTree::new();
        let value = tree.alloc(Node::null());
        let key = tree.alloc_scalar(Scalar::string("a"));
        let map = tree.alloc(Node::Mapping(vec![MapEntry { key, value }]));
        let alias = tree.alloc(Node::Alias(value));

        tree.replace(value, Node::Scalar(Scalar::int(5)));

        assert_eq!(tree.render(map), "{a: 5}");
        assert_eq!(tree.render(alias), "5");
    }

    #[test]
    fn resolve_stops_on_alias_cycle() {
        let mut tree = NodeTree::new();
        let a = tree.alloc(Node::null());
        tree.replace(a, Node::Alias(a));
        assert_eq!(tree.kind(tree.resolve(a)), NodeKind::Alias);
    }

    #[test]
    fn deep_copy_detaches_containers() {
        let mut tree = NodeTree::new();
        let one = tree.alloc_scalar(Scalar::int(1));
        let seq = tree.alloc(Node::Sequence(vec![one]));
        let copy = tree.deep_copy(seq);
        tree.replace(one, Node::Scalar(Scalar::int(2)));
        assert_eq!(tree.render(seq), "[2]");
        assert_eq!(tree.render(copy), "[1]");
    }

    #[test]
    fn graft_keeps_aliases_shared() {
        let mut source = NodeTree::new();
        let target = source.alloc_scalar(Scalar::int(1));
        source.set_anchor(target, "one");
        let alias = source.alloc(Node::Alias(target));
        let seq = source.alloc(Node::Sequence(vec![target, alias]));

        let mut tree = NodeTree::new();
        let grafted = tree.graft(&source, seq);
        let items = tree.items(grafted).unwrap().to_vec();
        assert_eq!(tree.get(items[1]), &Node::Alias(items[0]));
        assert_eq!(tree.anchor(items[0]), Some("one"));

        tree.replace(items[0], Node::Scalar(Scalar::int(2)));
        assert_eq!(tree.render(grafted), "[2, 2]");
    }

    #[test]
    fn numbers_compare_by_value() {
        let mut tree = NodeTree::new();
        let a = tree.alloc_scalar(Scalar::int(1));
        let b = tree.alloc_scalar(Scalar::float(1.0));
        let c = tree.alloc_scalar(Scalar::string("1"));
        assert!(tree.deep_equal(a, b));
        assert!(!tree.deep_equal(a, c));
    }
}
